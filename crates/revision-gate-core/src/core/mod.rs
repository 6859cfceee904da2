// crates/revision-gate-core/src/core/mod.rs
// ============================================================================
// Module: Revision Gate Core Types
// Description: Canonical data model for evidence-gated document revision.
// Purpose: Provide stable, serializable types shared by every pipeline stage.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types describe sources, gates, patches, the document tree, tracked
//! changes, audit records, and runpack manifests. Runtime stages consume and
//! produce these types; hosts serialize them into artifacts.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod document;
pub mod gate;
pub mod hashing;
pub mod identifiers;
pub mod patch;
pub mod revision;
pub mod runpack;
pub mod source;
pub mod summary;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEntry;
pub use audit::CHANGE_AUDIT_HEADERS;
pub use audit::ChangeAuditRow;
pub use audit::PatchStatus;
pub use audit::QUESTION_SOURCE_HEADERS;
pub use audit::QuestionSourceRow;
pub use document::Block;
pub use document::Document;
pub use document::FieldCharKind;
pub use document::Footnote;
pub use document::FootnoteTable;
pub use document::Markup;
pub use document::OpaqueItem;
pub use document::Paragraph;
pub use document::ParagraphItem;
pub use document::Revision;
pub use document::Run;
pub use document::RunContent;
pub use document::TrackedChangeCounts;
pub use gate::ClaimClass;
pub use gate::DEFAULT_GATE_RULES;
pub use gate::FulltextScope;
pub use gate::GateConfig;
pub use gate::GateDecision;
pub use gate::GateFailureReason;
pub use gate::GateOutcome;
pub use gate::GateReport;
pub use gate::GateRule;
pub use gate::QuestionGate;
pub use hashing::ContentFingerprint;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::PatchId;
pub use identifiers::QuestionId;
pub use identifiers::RunId;
pub use identifiers::SourceId;
pub use patch::FieldViolation;
pub use patch::FootnoteRef;
pub use patch::MalformedPatchSpecError;
pub use patch::PatchBatch;
pub use patch::PatchOperation;
pub use patch::PatchSpec;
pub use patch::RejectedPatch;
pub use revision::DocumentAnchor;
pub use revision::LocateOutcome;
pub use revision::RunSpan;
pub use revision::TrackedChange;
pub use runpack::ArtifactKind;
pub use runpack::ArtifactRecord;
pub use runpack::FileHashEntry;
pub use runpack::InputRecord;
pub use runpack::InputRole;
pub use runpack::RunpackIntegrity;
pub use runpack::RunpackManifest;
pub use runpack::RunpackVersion;
pub use source::SourceKind;
pub use source::SourceRecord;
pub use source::SourceRegistry;
pub use source::SourceRegistryError;
pub use summary::DEFAULT_AUTHOR;
pub use summary::PatchCounts;
pub use summary::RunContext;
pub use summary::RunStatus;
pub use summary::RunSummary;
pub use time::TimeError;
pub use time::Timestamp;
