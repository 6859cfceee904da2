// crates/revision-gate-core/src/runtime/runpack.rs
// ============================================================================
// Module: Revision Gate Runpack Builder and Verifier
// Description: Writes a run's artifacts with digests and re-verifies them offline.
// Purpose: Make every revision run independently auditable after the fact.
// Dependencies: crate::{core, interfaces, runtime}, serde, serde_jcs
// ============================================================================

//! ## Overview
//! The builder writes the gate report, change audit, question-to-source map,
//! revised document, and run summary through an [`ArtifactSink`], then
//! finalizes a manifest indexing every file with its digest plus a root hash
//! over the digest list. The verifier re-reads each file, recomputes every
//! digest, and checks the gate report's internal consistency; any deviation
//! fails the report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ArtifactKind;
use crate::core::ArtifactRecord;
use crate::core::FileHashEntry;
use crate::core::GateOutcome;
use crate::core::GateReport;
use crate::core::InputRecord;
use crate::core::RunId;
use crate::core::RunSummary;
use crate::core::RunpackIntegrity;
use crate::core::RunpackManifest;
use crate::core::RunpackVersion;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::ContentFingerprint;
use crate::core::hashing::hash_bytes;
use crate::core::hashing::hash_canonical_json;
use crate::interfaces::Artifact;
use crate::interfaces::ArtifactError;
use crate::interfaces::ArtifactReader;
use crate::interfaces::ArtifactSink;
use crate::runtime::engine::RevisionOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the runpack manifest, relative to the runpack root.
pub const MANIFEST_FILE_NAME: &str = "runpack.json";
/// Media type of JSON artifacts.
const JSON_CONTENT_TYPE: &str = "application/json";
/// Media type of CSV artifacts.
const CSV_CONTENT_TYPE: &str = "text/csv";
/// Media type of revised documents.
const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// Largest gate report the verifier parses.
const MAX_GATE_REPORT_BYTES: usize = 16 * 1024 * 1024;

/// Runpack-relative path of an artifact for a run.
#[must_use]
pub fn artifact_path(kind: ArtifactKind, run_id: &RunId) -> String {
    match kind {
        ArtifactKind::GateReport => format!("reports/gate_report_{run_id}.json"),
        ArtifactKind::ChangeAudit => format!("revision/change_audit_{run_id}.csv"),
        ArtifactKind::QuestionSourceMap => format!("reports/q_source_map_{run_id}.csv"),
        ArtifactKind::RevisedDocument => format!("revision/revised_{run_id}.docx"),
        ArtifactKind::RunSummary => format!("reports/run_summary_{run_id}.json"),
        ArtifactKind::VerifierReport => format!("reports/verifier_report_{run_id}.json"),
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Run summary artifact body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummaryArtifact {
    /// Status, counts, and run context.
    pub summary: RunSummary,
    /// Input fingerprints.
    pub inputs: Vec<InputRecord>,
}

/// Runpack builder for revision runs.
#[derive(Debug, Clone)]
pub struct RunpackBuilder {
    /// Manifest version identifier.
    pub manifest_version: RunpackVersion,
    /// Hash algorithm used for runpack artifacts.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for RunpackBuilder {
    fn default() -> Self {
        Self {
            manifest_version: RunpackVersion("v1".to_string()),
            hash_algorithm: DEFAULT_HASH_ALGORITHM,
        }
    }
}

impl RunpackBuilder {
    /// Writes every run artifact and finalizes the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`RunpackError`] when an artifact cannot be rendered or written.
    pub fn build<S: ArtifactSink>(
        &self,
        sink: &mut S,
        outcome: &RevisionOutcome,
        revised_document: &[u8],
        inputs: &[InputRecord],
    ) -> Result<RunpackManifest, RunpackError> {
        let index = self.write_artifacts(sink, outcome, revised_document, inputs)?;
        let manifest = self.manifest(outcome, inputs, index)?;
        sink.finalize(&manifest)?;
        Ok(manifest)
    }

    /// Builds a runpack with an offline verification report, finalizing the
    /// manifest once both are written.
    ///
    /// # Errors
    ///
    /// Returns [`RunpackError`] when generation or verification fails.
    pub fn build_with_verification<S: ArtifactSink, R: ArtifactReader>(
        &self,
        sink: &mut S,
        reader: &R,
        outcome: &RevisionOutcome,
        revised_document: &[u8],
        inputs: &[InputRecord],
    ) -> Result<(RunpackManifest, VerificationReport), RunpackError> {
        let mut index = self.write_artifacts(sink, outcome, revised_document, inputs)?;
        let draft = self.manifest(outcome, inputs, index.clone())?;
        let verifier = RunpackVerifier::new(self.hash_algorithm);
        let report = verifier.verify_manifest(reader, &draft)?;

        index.write_json(sink, &draft.run_id, ArtifactKind::VerifierReport, &report)?;
        let manifest = self.manifest(outcome, inputs, index)?;
        sink.finalize(&manifest)?;
        Ok((manifest, report))
    }

    /// Writes the run artifacts in their fixed order.
    fn write_artifacts<S: ArtifactSink>(
        &self,
        sink: &mut S,
        outcome: &RevisionOutcome,
        revised_document: &[u8],
        inputs: &[InputRecord],
    ) -> Result<ArtifactIndex, RunpackError> {
        let run_id = &outcome.summary.context.run_id;
        let mut index = ArtifactIndex::new(self.hash_algorithm);

        index.write_json(sink, run_id, ArtifactKind::GateReport, &outcome.gate_report)?;
        let change_audit = outcome
            .audit
            .change_audit_csv()
            .map_err(|err| RunpackError::Serialization(err.to_string()))?;
        index.write(sink, run_id, ArtifactKind::ChangeAudit, CSV_CONTENT_TYPE, change_audit)?;
        let question_map = outcome
            .audit
            .question_source_map_csv()
            .map_err(|err| RunpackError::Serialization(err.to_string()))?;
        index.write(sink, run_id, ArtifactKind::QuestionSourceMap, CSV_CONTENT_TYPE, question_map)?;
        index.write(
            sink,
            run_id,
            ArtifactKind::RevisedDocument,
            DOCX_CONTENT_TYPE,
            revised_document.to_vec(),
        )?;
        let summary = RunSummaryArtifact {
            summary: outcome.summary.clone(),
            inputs: inputs.to_vec(),
        };
        index.write_json(sink, run_id, ArtifactKind::RunSummary, &summary)?;
        Ok(index)
    }

    /// Assembles the manifest for the written artifacts.
    fn manifest(
        &self,
        outcome: &RevisionOutcome,
        inputs: &[InputRecord],
        index: ArtifactIndex,
    ) -> Result<RunpackManifest, RunpackError> {
        Ok(RunpackManifest {
            manifest_version: self.manifest_version.clone(),
            run_id: outcome.summary.context.run_id.clone(),
            generated_at: outcome.summary.context.timestamp,
            hash_algorithm: self.hash_algorithm,
            inputs: inputs.to_vec(),
            integrity: build_integrity(&index.file_hashes, self.hash_algorithm)?,
            artifacts: index.artifacts,
        })
    }
}

/// Artifact records and file digests accumulated while writing.
#[derive(Debug, Clone)]
struct ArtifactIndex {
    /// Digest algorithm.
    algorithm: HashAlgorithm,
    /// Artifact records in write order.
    artifacts: Vec<ArtifactRecord>,
    /// File digests in write order.
    file_hashes: Vec<FileHashEntry>,
}

impl ArtifactIndex {
    /// Creates an empty index.
    const fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            artifacts: Vec::new(),
            file_hashes: Vec::new(),
        }
    }

    /// Writes a canonical JSON artifact.
    fn write_json<S: ArtifactSink, T: Serialize>(
        &mut self,
        sink: &mut S,
        run_id: &RunId,
        kind: ArtifactKind,
        value: &T,
    ) -> Result<(), RunpackError> {
        let bytes =
            serde_jcs::to_vec(value).map_err(|err| RunpackError::Serialization(err.to_string()))?;
        self.write(sink, run_id, kind, JSON_CONTENT_TYPE, bytes)
    }

    /// Writes an artifact and records its digest.
    fn write<S: ArtifactSink>(
        &mut self,
        sink: &mut S,
        run_id: &RunId,
        kind: ArtifactKind,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), RunpackError> {
        let path = artifact_path(kind, run_id);
        let ContentFingerprint {
            hash,
            size_bytes,
        } = ContentFingerprint::of(self.algorithm, &bytes);
        let artifact = Artifact {
            kind,
            path: path.clone(),
            content_type: content_type.to_string(),
            bytes,
            required: true,
        };
        sink.write(&artifact)?;

        self.artifacts.push(ArtifactRecord {
            artifact_id: path.clone(),
            kind,
            path: path.clone(),
            content_type: content_type.to_string(),
            hash: hash.clone(),
            size_bytes,
            required: true,
        });
        self.file_hashes.push(FileHashEntry {
            path,
            hash,
        });
        Ok(())
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Runpack verifier for offline validation.
#[derive(Debug, Clone, Copy)]
pub struct RunpackVerifier {
    /// Hash algorithm used for verification.
    hash_algorithm: HashAlgorithm,
}

impl Default for RunpackVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_ALGORITHM)
    }
}

impl RunpackVerifier {
    /// Creates a new verifier.
    #[must_use]
    pub const fn new(hash_algorithm: HashAlgorithm) -> Self {
        Self {
            hash_algorithm,
        }
    }

    /// Verifies a runpack manifest using the provided artifact reader.
    ///
    /// # Errors
    ///
    /// Returns [`RunpackError`] when verification cannot be carried out. A
    /// runpack that fails its checks yields a report with
    /// [`VerificationStatus::Fail`], not an error.
    pub fn verify_manifest<R: ArtifactReader>(
        &self,
        reader: &R,
        manifest: &RunpackManifest,
    ) -> Result<VerificationReport, RunpackError> {
        let mut errors = Vec::new();
        let mut checked = 0usize;

        if manifest.hash_algorithm != self.hash_algorithm {
            errors.push("hash algorithm mismatch".to_string());
        }

        for entry in &manifest.integrity.file_hashes {
            match reader.read(&entry.path) {
                Ok(bytes) => {
                    let actual = hash_bytes(self.hash_algorithm, &bytes);
                    if actual != entry.hash {
                        errors.push(format!("hash mismatch for {}", entry.path));
                    }
                    checked = checked.saturating_add(1);
                }
                Err(_) => {
                    errors.push(format!("missing artifact {}", entry.path));
                }
            }
        }

        for artifact in &manifest.artifacts {
            let listed = manifest
                .integrity
                .file_hashes
                .iter()
                .any(|entry| entry.path == artifact.path && entry.hash == artifact.hash);
            if artifact.required && !listed {
                errors.push(format!(
                    "artifact {} is not covered by the integrity list",
                    artifact.path
                ));
            }
        }

        if let Ok(root_hash) =
            hash_canonical_json(self.hash_algorithm, &manifest.integrity.file_hashes)
        {
            if root_hash != manifest.integrity.root_hash {
                errors.push("root hash mismatch".to_string());
            }
        } else {
            errors.push("failed to compute root hash".to_string());
        }

        if let Err(err) = verify_gate_report(reader, manifest) {
            errors.push(err);
        }

        let status =
            if errors.is_empty() { VerificationStatus::Pass } else { VerificationStatus::Fail };

        Ok(VerificationReport {
            status,
            checked_files: checked,
            errors,
        })
    }
}

// ============================================================================
// SECTION: Verification Types
// ============================================================================

/// Verification status for runpack reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Verification succeeded.
    Pass,
    /// Verification failed.
    Fail,
}

/// Offline verification report for runpacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Verification status.
    pub status: VerificationStatus,
    /// Count of checked files.
    pub checked_files: usize,
    /// Error messages, if any.
    pub errors: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Runpack generation or verification errors.
#[derive(Debug, Error)]
pub enum RunpackError {
    /// Artifact errors.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// Hashing errors.
    #[error("hashing error: {0}")]
    Hash(String),
    /// Serialization errors.
    #[error("serialization error: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds integrity metadata from file hashes.
fn build_integrity(
    file_hashes: &[FileHashEntry],
    algorithm: HashAlgorithm,
) -> Result<RunpackIntegrity, RunpackError> {
    let root_hash = hash_canonical_json(algorithm, file_hashes)
        .map_err(|err| RunpackError::Hash(err.to_string()))?;
    Ok(RunpackIntegrity {
        file_hashes: file_hashes.to_vec(),
        root_hash,
    })
}

/// Verifies the gate report's structure and decision consistency.
fn verify_gate_report<R: ArtifactReader>(
    reader: &R,
    manifest: &RunpackManifest,
) -> Result<(), String> {
    let path = manifest
        .artifacts
        .iter()
        .find(|artifact| artifact.kind == ArtifactKind::GateReport)
        .map(|artifact| artifact.path.clone())
        .ok_or_else(|| "manifest lists no gate report".to_string())?;
    let bytes = reader
        .read_with_limit(&path, MAX_GATE_REPORT_BYTES)
        .map_err(|_| "missing gate report".to_string())?;
    let report: GateReport =
        serde_json::from_slice(&bytes).map_err(|err| format!("invalid gate report: {err}"))?;

    for (question_id, decision) in &report.decisions {
        if &decision.question_id != question_id {
            return Err(format!("gate report key {question_id} does not match its decision"));
        }
        let failed = decision.outcome == GateOutcome::Fail;
        if failed == decision.reasons.is_empty() {
            return Err(format!("gate decision for {question_id} contradicts its reasons"));
        }
        if decision.required_sources.is_empty() && !failed {
            return Err(format!("gate decision for {question_id} passed without required sources"));
        }
    }
    Ok(())
}
