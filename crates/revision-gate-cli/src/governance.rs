// crates/revision-gate-cli/src/governance.rs
// ============================================================================
// Module: Run Governance Manifests
// Description: Sync and deletion manifests written alongside each runpack.
// Purpose: Record which inputs a run read and which files it created or removed.
// Dependencies: csv, revision-gate-core, serde, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! Each run writes two tab-separated manifests under `manifests/`. The sync
//! manifest lists every input the run read and every file it created, with
//! SHA-256 digests and sizes. The deletion manifest lists files the run
//! removed; runs never delete anything, so it always carries a single
//! `no_deletions` row. The deletion manifest is written first so the sync
//! manifest can list it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use revision_gate_core::ArtifactError;
use revision_gate_core::InputRecord;
use revision_gate_core::MANIFEST_FILE_NAME;
use revision_gate_core::RunId;
use revision_gate_core::RunpackManifest;
use revision_gate_core::core::hashing::DEFAULT_HASH_ALGORITHM;
use revision_gate_core::core::hashing::ContentFingerprint;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::artifacts::FileArtifactSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Column order of the sync manifest.
pub const SYNC_MANIFEST_HEADERS: [&str; 8] =
    ["run_id", "phase", "file", "role", "status", "sha256", "size_bytes", "created_at"];

/// Column order of the deletion manifest.
pub const DELETED_MANIFEST_HEADERS: [&str; 6] =
    ["run_id", "reason", "status_before", "status_after", "path", "deleted_at"];

/// Placeholder for deletion columns that have no value.
const NOT_APPLICABLE: &str = "n/a";

/// Runpack-relative path of the sync manifest.
#[must_use]
pub fn sync_manifest_path(run_id: &RunId) -> String {
    format!("manifests/sync_manifest_{run_id}.tsv")
}

/// Runpack-relative path of the deletion manifest.
#[must_use]
pub fn deleted_manifest_path(run_id: &RunId) -> String {
    format!("manifests/deleted_manifest_{run_id}.tsv")
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// One sync manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRow {
    /// Run identifier.
    pub run_id: String,
    /// `input`, `runpack`, or `governance`.
    pub phase: String,
    /// Input file name or runpack-relative path.
    pub file: String,
    /// Input role or artifact kind.
    pub role: String,
    /// `read` for inputs, `created` for outputs.
    pub status: String,
    /// Lowercase hex SHA-256 digest.
    pub sha256: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Run timestamp (RFC 3339).
    pub created_at: String,
}

/// One deletion manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRow {
    /// Run identifier.
    pub run_id: String,
    /// Why the file was removed.
    pub reason: String,
    /// Status before removal.
    pub status_before: String,
    /// Status after removal.
    pub status_after: String,
    /// Removed path.
    pub path: String,
    /// Removal timestamp (RFC 3339).
    pub deleted_at: String,
}

impl DeletedRow {
    /// Row recorded when a run removed nothing.
    #[must_use]
    pub fn no_deletions(run_id: &RunId, timestamp: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            reason: "no_deletions".to_string(),
            status_before: NOT_APPLICABLE.to_string(),
            status_after: NOT_APPLICABLE.to_string(),
            path: NOT_APPLICABLE.to_string(),
            deleted_at: timestamp.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Governance manifest errors.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Manifest rendering failed.
    #[error("governance manifest rendering failed: {0}")]
    Render(String),
    /// Manifest could not be written.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Paths of the written governance manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernancePaths {
    /// Runpack-relative sync manifest path.
    pub sync_manifest: String,
    /// Runpack-relative deletion manifest path.
    pub deleted_manifest: String,
}

/// Accumulates sync rows for one run.
#[derive(Debug, Clone)]
pub struct GovernanceLedger {
    /// Run identifier.
    run_id: RunId,
    /// Run timestamp (RFC 3339).
    timestamp: String,
    /// Sync rows in record order.
    rows: Vec<SyncRow>,
}

impl GovernanceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(run_id: RunId, timestamp: impl Into<String>) -> Self {
        Self {
            run_id,
            timestamp: timestamp.into(),
            rows: Vec::new(),
        }
    }

    /// Sync rows recorded so far.
    #[must_use]
    pub fn rows(&self) -> &[SyncRow] {
        &self.rows
    }

    /// Records every run input as read.
    pub fn record_inputs(&mut self, inputs: &[InputRecord]) {
        for input in inputs {
            self.push(
                "input",
                &input.name,
                input.role.as_str(),
                "read",
                &input.hash.value,
                input.size_bytes,
            );
        }
    }

    /// Records every manifest artifact and the manifest file as created.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::Render`] when the manifest cannot be canonicalized.
    pub fn record_runpack(&mut self, manifest: &RunpackManifest) -> Result<(), GovernanceError> {
        for artifact in &manifest.artifacts {
            self.push(
                "runpack",
                &artifact.path,
                artifact.kind.as_str(),
                "created",
                &artifact.hash.value,
                artifact.size_bytes,
            );
        }
        let bytes =
            serde_jcs::to_vec(manifest).map_err(|err| GovernanceError::Render(err.to_string()))?;
        let fingerprint = ContentFingerprint::of(DEFAULT_HASH_ALGORITHM, &bytes);
        self.push(
            "runpack",
            MANIFEST_FILE_NAME,
            "manifest",
            "created",
            &fingerprint.hash.value,
            fingerprint.size_bytes,
        );
        Ok(())
    }

    /// Writes the deletion manifest, then the sync manifest listing it.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when rendering fails or either file already exists.
    pub fn write(mut self, sink: &FileArtifactSink) -> Result<GovernancePaths, GovernanceError> {
        let deleted_path = deleted_manifest_path(&self.run_id);
        let deleted = render_tsv(
            &DELETED_MANIFEST_HEADERS,
            &[DeletedRow::no_deletions(&self.run_id, &self.timestamp)],
        )?;
        sink.write_file(&deleted_path, &deleted)?;
        let fingerprint = ContentFingerprint::of(DEFAULT_HASH_ALGORITHM, &deleted);
        self.push(
            "governance",
            &deleted_path,
            "deleted_manifest",
            "created",
            &fingerprint.hash.value,
            fingerprint.size_bytes,
        );

        let sync_path = sync_manifest_path(&self.run_id);
        let sync = render_tsv(&SYNC_MANIFEST_HEADERS, &self.rows)?;
        sink.write_file(&sync_path, &sync)?;
        Ok(GovernancePaths {
            sync_manifest: sync_path,
            deleted_manifest: deleted_path,
        })
    }

    /// Appends one row.
    fn push(
        &mut self,
        phase: &str,
        file: &str,
        role: &str,
        status: &str,
        sha256: &str,
        size_bytes: u64,
    ) {
        self.rows.push(SyncRow {
            run_id: self.run_id.to_string(),
            phase: phase.to_string(),
            file: file.to_string(),
            role: role.to_string(),
            status: status.to_string(),
            sha256: sha256.to_string(),
            size_bytes,
            created_at: self.timestamp.clone(),
        });
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders rows as tab-separated values with a header row.
///
/// # Errors
///
/// Returns [`GovernanceError::Render`] when a row cannot be serialized.
pub fn render_tsv<T: Serialize>(headers: &[&str], rows: &[T]) -> Result<Vec<u8>, GovernanceError> {
    let mut writer =
        csv::WriterBuilder::new().delimiter(b'\t').has_headers(false).from_writer(Vec::new());
    writer.write_record(headers).map_err(|err| GovernanceError::Render(err.to_string()))?;
    for row in rows {
        writer.serialize(row).map_err(|err| GovernanceError::Render(err.to_string()))?;
    }
    writer.into_inner().map_err(|err| GovernanceError::Render(err.to_string()))
}
