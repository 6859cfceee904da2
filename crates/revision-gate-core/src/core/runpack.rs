// crates/revision-gate-core/src/core/runpack.rs
// ============================================================================
// Module: Revision Gate Runpack Manifest
// Description: Manifest schema indexing every artifact of a revision run.
// Purpose: Let an auditor re-verify a run's outputs offline.
// Dependencies: crate::core::{hashing, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A runpack is the directory of artifacts one run produces. The manifest
//! records the digest and size of each artifact and of each input, plus a root
//! hash over the ordered artifact hash list, so tampering with any file or with
//! the list itself is detectable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::ContentFingerprint;
use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::RunId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Manifest Types
// ============================================================================

/// Manifest schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunpackVersion(pub String);

/// Runpack manifest.
///
/// # Invariants
/// - Paths are runpack-relative.
/// - `integrity.root_hash` is the canonical hash of `integrity.file_hashes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunpackManifest {
    /// Manifest version identifier.
    pub manifest_version: RunpackVersion,
    /// Run the artifacts belong to.
    pub run_id: RunId,
    /// Timestamp of the run.
    pub generated_at: Timestamp,
    /// Hash algorithm for every digest in the manifest.
    pub hash_algorithm: HashAlgorithm,
    /// Fingerprints of the run inputs.
    pub inputs: Vec<InputRecord>,
    /// Integrity metadata.
    pub integrity: RunpackIntegrity,
    /// Artifact index.
    pub artifacts: Vec<ArtifactRecord>,
}

/// Integrity metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunpackIntegrity {
    /// Per-file digests in write order.
    pub file_hashes: Vec<FileHashEntry>,
    /// Digest over `file_hashes`.
    pub root_hash: HashDigest,
}

/// Digest of one runpack file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashEntry {
    /// Runpack-relative path.
    pub path: String,
    /// Content digest.
    pub hash: HashDigest,
}

/// Indexed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Artifact identifier.
    pub artifact_id: String,
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Runpack-relative path.
    pub path: String,
    /// Media type.
    pub content_type: String,
    /// Content digest.
    pub hash: HashDigest,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Whether verification requires the artifact.
    pub required: bool,
}

/// Fingerprint of a run input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Input role.
    pub role: InputRole,
    /// File name as supplied by the host.
    pub name: String,
    /// Content digest.
    pub hash: HashDigest,
    /// Size in bytes.
    pub size_bytes: u64,
}

impl InputRecord {
    /// Records an input from its fingerprint.
    #[must_use]
    pub fn new(role: InputRole, name: impl Into<String>, fingerprint: ContentFingerprint) -> Self {
        Self {
            role,
            name: name.into(),
            hash: fingerprint.hash,
            size_bytes: fingerprint.size_bytes,
        }
    }
}

/// Role of a run input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRole {
    /// Document being revised.
    Document,
    /// Patch batch.
    PatchSpec,
    /// Source registry snapshot.
    SourceRegistry,
    /// Gate configuration.
    GateConfig,
}

impl InputRole {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::PatchSpec => "patch_spec",
            Self::SourceRegistry => "source_registry",
            Self::GateConfig => "gate_config",
        }
    }
}

/// Artifact kinds in a revision runpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Per-question gate decisions.
    GateReport,
    /// One row per patch.
    ChangeAudit,
    /// One row per question.
    QuestionSourceMap,
    /// Revised document.
    RevisedDocument,
    /// Run status and counts.
    RunSummary,
    /// Offline verification report.
    VerifierReport,
}

impl ArtifactKind {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GateReport => "gate_report",
            Self::ChangeAudit => "change_audit",
            Self::QuestionSourceMap => "q_source_map",
            Self::RevisedDocument => "revised_document",
            Self::RunSummary => "run_summary",
            Self::VerifierReport => "verifier_report",
        }
    }
}
