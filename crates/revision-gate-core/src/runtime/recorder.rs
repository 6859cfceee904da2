// crates/revision-gate-core/src/runtime/recorder.rs
// ============================================================================
// Module: Revision Gate Audit Trail Recorder
// Description: Collects one audit entry per patch and projects the audit views.
// Purpose: Derive the change audit and question-to-source map from one list.
// Dependencies: crate::core, csv, thiserror
// ============================================================================

//! ## Overview
//! The recorder is append-only and keyed by the record's input position, so a
//! patch can never be recorded twice. Both tabular views are computed from the
//! stored entries on demand; nothing else feeds them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::AuditEntry;
use crate::core::CHANGE_AUDIT_HEADERS;
use crate::core::ChangeAuditRow;
use crate::core::GateOutcome;
use crate::core::QUESTION_SOURCE_HEADERS;
use crate::core::QuestionId;
use crate::core::QuestionSourceRow;
use crate::core::SourceId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Audit recording and rendering errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A record position was recorded twice.
    #[error("patch record {position} already has an audit entry")]
    Duplicate {
        /// Record position.
        position: usize,
    },
    /// Tabular rendering failed.
    #[error("audit csv error: {0}")]
    Csv(String),
}

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Append-only audit trail for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditRecorder {
    /// Entries keyed by record position.
    entries: BTreeMap<usize, AuditEntry>,
}

impl AuditRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one patch's entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Duplicate`] when the record position already has an entry.
    pub fn record(&mut self, entry: AuditEntry) -> Result<(), AuditError> {
        if self.entries.contains_key(&entry.position) {
            return Err(AuditError::Duplicate {
                position: entry.position,
            });
        }
        self.entries.insert(entry.position, entry);
        Ok(())
    }

    /// Entries in record order.
    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.values()
    }

    /// Entry for a record position.
    #[must_use]
    pub fn entry(&self, position: usize) -> Option<&AuditEntry> {
        self.entries.get(&position)
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Change audit view: one row per patch in record order.
    #[must_use]
    pub fn change_audit(&self) -> Vec<ChangeAuditRow> {
        self.entries().map(change_audit_row).collect()
    }

    /// Question-to-source view: one row per question, sorted by question id.
    ///
    /// Every source a patch cited or the gate consulted is listed, whatever
    /// the outcome.
    #[must_use]
    pub fn question_source_map(&self) -> Vec<QuestionSourceRow> {
        let mut groups: BTreeMap<&QuestionId, QuestionGroup<'_>> = BTreeMap::new();
        for entry in self.entries() {
            let Some(question_id) = &entry.question_id else {
                continue;
            };
            let group = groups.entry(question_id).or_default();
            if group.outcome.is_none() {
                group.outcome = entry.gate_outcome;
            }
            for source_id in entry.consulted_sources.iter().chain(entry.source_refs.iter()) {
                if !group.sources.contains(&source_id) {
                    group.sources.push(source_id);
                }
            }
            group.total += 1;
            if entry.applied {
                group.applied += 1;
            }
        }
        groups
            .into_iter()
            .map(|(question_id, group)| QuestionSourceRow {
                question_id: question_id.to_string(),
                outcome: group.outcome.map_or("not_evaluated", GateOutcome::as_str).to_string(),
                consulted_sources: join(group.sources.iter().map(|id| id.as_str())),
                has_sources: !group.sources.is_empty(),
                patches_total: group.total,
                patches_applied: group.applied,
            })
            .collect()
    }

    /// Change audit rendered as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Csv`] when rendering fails.
    pub fn change_audit_csv(&self) -> Result<Vec<u8>, AuditError> {
        render_csv(&CHANGE_AUDIT_HEADERS, &self.change_audit())
    }

    /// Question-to-source map rendered as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Csv`] when rendering fails.
    pub fn question_source_map_csv(&self) -> Result<Vec<u8>, AuditError> {
        render_csv(&QUESTION_SOURCE_HEADERS, &self.question_source_map())
    }
}

/// Per-question accumulator.
#[derive(Debug, Default)]
struct QuestionGroup<'a> {
    /// First gate outcome seen for the question.
    outcome: Option<GateOutcome>,
    /// Sources in first-seen order.
    sources: Vec<&'a SourceId>,
    /// Patches recorded.
    total: usize,
    /// Patches applied.
    applied: usize,
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Projects one entry into a change audit row.
fn change_audit_row(entry: &AuditEntry) -> ChangeAuditRow {
    ChangeAuditRow {
        patch_id: entry.patch_id.to_string(),
        position: entry.position,
        question_id: entry.question_id.as_ref().map(ToString::to_string).unwrap_or_default(),
        gate_outcome: entry.gate_outcome.map(GateOutcome::as_str).unwrap_or_default().to_string(),
        status: entry.status.as_str().to_string(),
        applied: entry.applied,
        before_text: entry.before_text.clone(),
        after_text: entry.after_text.clone(),
        reason: entry.reason.clone(),
        source_refs: join(entry.source_refs.iter().map(SourceId::as_str)),
        change_ids: entry.change_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(";"),
        detail: entry.detail.clone(),
    }
}

/// Joins identifiers with `;`.
fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(";")
}

/// Writes a header row followed by serialized rows.
fn render_csv<T: serde::Serialize>(headers: &[&str], rows: &[T]) -> Result<Vec<u8>, AuditError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(headers).map_err(|err| AuditError::Csv(err.to_string()))?;
    for row in rows {
        writer.serialize(row).map_err(|err| AuditError::Csv(err.to_string()))?;
    }
    writer.into_inner().map_err(|err| AuditError::Csv(err.to_string()))
}
