// crates/revision-gate-cli/src/query.rs
// ============================================================================
// Module: Runpack Question Query
// Description: Looks up one question's evidence and edits in a written runpack.
// Purpose: Answer "what happened to question X" from run artifacts alone.
// Dependencies: csv, revision-gate-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The query reads `runpack.json`, locates the question-to-source map and the
//! change audit through the manifest, and filters both tables by question id.
//! Artifact paths come from the manifest, so the same code reads runpacks
//! produced under any run id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use revision_gate_core::ArtifactError;
use revision_gate_core::ArtifactKind;
use revision_gate_core::ArtifactReader;
use revision_gate_core::ChangeAuditRow;
use revision_gate_core::MANIFEST_FILE_NAME;
use revision_gate_core::QuestionSourceRow;
use revision_gate_core::RunId;
use revision_gate_core::RunpackManifest;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::artifacts::FileArtifactReader;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest manifest the query reads.
const MAX_MANIFEST_BYTES: usize = 16 * 1024 * 1024;
/// Largest audit table the query reads.
const MAX_TABLE_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Runpack query errors.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A runpack file could not be read.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// The manifest is not a runpack manifest.
    #[error("invalid runpack manifest: {0}")]
    Manifest(String),
    /// The manifest does not index a required table.
    #[error("runpack has no {0} artifact")]
    MissingArtifact(&'static str),
    /// A table could not be parsed.
    #[error("invalid {table} table: {message}")]
    Table {
        /// Table label.
        table: &'static str,
        /// Parser message.
        message: String,
    },
    /// The runpack has no rows for the question.
    #[error("question {0} does not appear in this runpack")]
    UnknownQuestion(String),
}

// ============================================================================
// SECTION: Query
// ============================================================================

/// Everything a runpack records about one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionReport {
    /// Run the runpack belongs to.
    pub run_id: RunId,
    /// Question queried.
    pub question_id: String,
    /// Question-to-source row, when the question was gated.
    pub sources: Option<QuestionSourceRow>,
    /// Change audit rows for the question, in record order.
    pub changes: Vec<ChangeAuditRow>,
}

/// Reads one question's rows from a runpack directory.
///
/// # Errors
///
/// Returns [`QueryError`] when the runpack cannot be read or has no rows for
/// the question.
pub fn query_question(
    runpack_dir: PathBuf,
    question_id: &str,
) -> Result<QuestionReport, QueryError> {
    let reader = FileArtifactReader::new(runpack_dir)?;
    let manifest_bytes = reader.read_with_limit(MANIFEST_FILE_NAME, MAX_MANIFEST_BYTES)?;
    let manifest: RunpackManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|err| QueryError::Manifest(err.to_string()))?;

    let question_rows: Vec<QuestionSourceRow> =
        read_table(&reader, &manifest, ArtifactKind::QuestionSourceMap)?;
    let change_rows: Vec<ChangeAuditRow> =
        read_table(&reader, &manifest, ArtifactKind::ChangeAudit)?;

    let sources = question_rows.into_iter().find(|row| row.question_id == question_id);
    let changes: Vec<ChangeAuditRow> =
        change_rows.into_iter().filter(|row| row.question_id == question_id).collect();
    if sources.is_none() && changes.is_empty() {
        return Err(QueryError::UnknownQuestion(question_id.to_string()));
    }
    Ok(QuestionReport {
        run_id: manifest.run_id,
        question_id: question_id.to_string(),
        sources,
        changes,
    })
}

/// Reads and parses the CSV artifact of one kind.
fn read_table<T: DeserializeOwned>(
    reader: &FileArtifactReader,
    manifest: &RunpackManifest,
    kind: ArtifactKind,
) -> Result<Vec<T>, QueryError> {
    let record = manifest
        .artifacts
        .iter()
        .find(|artifact| artifact.kind == kind)
        .ok_or(QueryError::MissingArtifact(kind.as_str()))?;
    let bytes = reader.read_with_limit(&record.path, MAX_TABLE_BYTES)?;
    let mut table = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes.as_slice());
    table
        .deserialize()
        .map(|row| {
            row.map_err(|err| QueryError::Table {
                table: kind.as_str(),
                message: err.to_string(),
            })
        })
        .collect()
}
