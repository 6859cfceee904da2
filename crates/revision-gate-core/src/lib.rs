// crates/revision-gate-core/src/lib.rs
// ============================================================================
// Module: Revision Gate Core Library
// Description: Public API surface for the Revision Gate core.
// Purpose: Expose core types, interfaces, and runtime stages.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Revision Gate core revises word-processor documents with tracked changes,
//! but only where a per-question evidence gate admits the edit. It is pure:
//! document formats and artifact storage plug in through [`DocumentCodec`]
//! and [`ArtifactSink`].
//! Invariants:
//! - A question with no declared required sources never passes its gate.
//! - Every patch record yields exactly one audit entry per run.
//! - A patch that cannot be applied leaves the document untouched.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::Artifact;
pub use interfaces::ArtifactError;
pub use interfaces::ArtifactReader;
pub use interfaces::ArtifactRef;
pub use interfaces::ArtifactSink;
pub use interfaces::CodecError;
pub use interfaces::DocumentCodec;
pub use runtime::AnchorLocator;
pub use runtime::AuditError;
pub use runtime::AuditRecorder;
pub use runtime::DocumentFormatError;
pub use runtime::EngineError;
pub use runtime::EvidenceGateEvaluator;
pub use runtime::LocateError;
pub use runtime::MANIFEST_FILE_NAME;
pub use runtime::PatchLoadError;
pub use runtime::PatchSpecLoader;
pub use runtime::RevisionEngine;
pub use runtime::RevisionOutcome;
pub use runtime::RunSummaryArtifact;
pub use runtime::RunpackBuilder;
pub use runtime::RunpackError;
pub use runtime::RunpackVerifier;
pub use runtime::TrackedChangeMutator;
pub use runtime::VerificationReport;
pub use runtime::VerificationStatus;
pub use runtime::artifact_path;
pub use runtime::resolve_span;
