// crates/revision-gate-cli/src/lib.rs
// ============================================================================
// Module: Revision Gate CLI Library
// Description: Run governance helpers for the revision-gate binary.
// Purpose: Keep filesystem, run id, and pipeline logic testable outside main.
// Dependencies: revision-gate-{core, config, docx}, rand, tempfile, csv
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) parses arguments and renders
//! output; everything that touches the filesystem lives here. Run
//! directories are write-once: artifacts are staged in a temporary file next
//! to their target and persisted without overwriting.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifacts;
pub mod governance;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod run_id;
