// crates/revision-gate-core/src/core/summary.rs
// ============================================================================
// Module: Revision Gate Run Context and Summary
// Description: Explicit per-run state and the run's final status record.
// Purpose: Thread run identity through the pipeline without ambient globals.
// Dependencies: crate::core::{document, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! [`RunContext`] holds everything that would otherwise be global: run id,
//! author identity, and timestamp. It is passed by reference into the gate,
//! locator, and mutator so that several runs can execute side by side in one
//! process (tests do this). [`RunSummary`] is the closing record of a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::document::TrackedChangeCounts;
use crate::core::identifiers::RunId;
use crate::core::time::TimeError;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Run Context
// ============================================================================

/// Author name used when the host does not supply one.
pub const DEFAULT_AUTHOR: &str = "revision-gate";

/// Explicit run state shared by every stage of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    /// Run identifier.
    pub run_id: RunId,
    /// Author stamped on tracked changes.
    pub author: String,
    /// Timestamp stamped on tracked changes and the manifest.
    pub timestamp: Timestamp,
}

impl RunContext {
    /// Creates a run context.
    #[must_use]
    pub fn new(run_id: RunId, author: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            run_id,
            author: author.into(),
            timestamp,
        }
    }

    /// Revision date string for tracked-change markup.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError`] when the timestamp cannot be rendered.
    pub fn revision_date(&self) -> Result<String, TimeError> {
        self.timestamp.to_rfc3339()
    }
}

// ============================================================================
// SECTION: Run Summary
// ============================================================================

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// At least one patch applied.
    Completed,
    /// Run finished without applying any patch.
    CompletedNoRevisions,
    /// Run could not execute (unreadable document, unwritable outputs).
    Failed,
}

impl RunStatus {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CompletedNoRevisions => "completed_no_revisions",
            Self::Failed => "failed",
        }
    }
}

/// Patch counts by disposition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchCounts {
    /// Records in the input batch.
    pub total: usize,
    /// Tracked changes written.
    pub applied: usize,
    /// Already present in the document.
    pub already_applied: usize,
    /// Failed validation.
    pub malformed: usize,
    /// Blocked by a gate.
    pub gate_failed: usize,
    /// Could not be located or edited.
    pub not_located: usize,
}

/// Closing record of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run context the run executed under.
    pub context: RunContext,
    /// Final status.
    pub status: RunStatus,
    /// Patch counts.
    pub patches: PatchCounts,
    /// Questions gated.
    pub questions_total: usize,
    /// Questions that passed their gate.
    pub questions_passed: usize,
    /// Tracked changes present in the input document.
    pub baseline_changes: TrackedChangeCounts,
    /// Tracked changes present after the run.
    pub final_changes: TrackedChangeCounts,
    /// Footnotes added by the run.
    pub footnotes_added: usize,
}
