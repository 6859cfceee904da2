// crates/revision-gate-docx/src/lib.rs
// ============================================================================
// Module: Revision Gate DOCX Codec
// Description: WordprocessingML package reader and writer.
// Purpose: Map `.docx` packages onto the core document tree and back.
// Dependencies: revision-gate-core, quick-xml, zip
// ============================================================================

//! ## Overview
//! This crate implements [`revision_gate_core::DocumentCodec`] for `.docx`
//! packages. The main document part is parsed down to runs; everything the
//! core does not interpret is carried as raw markup. On write, paragraphs the
//! run did not touch and every other package entry are copied byte-for-byte,
//! so the only differences in the output are the tracked changes and any
//! appended footnotes.
//! Security posture: documents are untrusted input; every part read from the
//! package is bounded by [`DocxCodecConfig`] limits.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod body;
pub mod codec;
pub mod error;
mod footnotes;
mod revisions;
mod writer;
mod xml;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use codec::DOCUMENT_PART;
pub use codec::DocxCodec;
pub use codec::DocxCodecConfig;
pub use codec::FOOTNOTES_PART;
pub use error::DocxError;
