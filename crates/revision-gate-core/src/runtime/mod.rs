// crates/revision-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Revision Gate Runtime
// Description: Gate evaluation, patch loading, anchoring, mutation, and audit.
// Purpose: Execute evidence-gated revision runs over a document snapshot.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement each pipeline stage and the engine that chains
//! them. Hosts call [`RevisionEngine::run`] and hand the outcome to
//! [`RunpackBuilder`]; every stage is also usable on its own for tests and
//! tooling.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod engine;
pub mod gate;
mod layout;
pub mod loader;
pub mod locator;
pub mod mutator;
pub mod recorder;
pub mod runpack;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::EngineError;
pub use engine::RevisionEngine;
pub use engine::RevisionOutcome;
pub use gate::EvidenceGateEvaluator;
pub use loader::PatchLoadError;
pub use loader::PatchSpecLoader;
pub use locator::AnchorLocator;
pub use locator::LocateError;
pub use locator::resolve_span;
pub use mutator::DocumentFormatError;
pub use mutator::TrackedChangeMutator;
pub use recorder::AuditError;
pub use recorder::AuditRecorder;
pub use runpack::MANIFEST_FILE_NAME;
pub use runpack::RunSummaryArtifact;
pub use runpack::RunpackBuilder;
pub use runpack::RunpackError;
pub use runpack::RunpackVerifier;
pub use runpack::VerificationReport;
pub use runpack::VerificationStatus;
pub use runpack::artifact_path;
