// crates/revision-gate-core/src/core/audit.rs
// ============================================================================
// Module: Revision Gate Audit Records
// Description: Per-patch audit entries and the two tabular views derived from them.
// Purpose: Prove after the fact which evidence justified which edit.
// Dependencies: crate::core::{gate, identifiers}, serde
// ============================================================================

//! ## Overview
//! Every patch record processed by a run yields exactly one [`AuditEntry`],
//! whether it was applied, rejected by its gate, malformed, or could not be
//! located. The change audit ([`ChangeAuditRow`]) and the question-to-source
//! map ([`QuestionSourceRow`]) are projections of the same entry list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::gate::GateOutcome;
use crate::core::identifiers::PatchId;
use crate::core::identifiers::QuestionId;
use crate::core::identifiers::SourceId;

// ============================================================================
// SECTION: Patch Status
// ============================================================================

/// Final disposition of a patch within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    /// Tracked change written.
    Applied,
    /// Document already carried the change; nothing written.
    AlreadyApplied,
    /// Record failed validation.
    Malformed,
    /// Question's evidence gate failed.
    GateFailed,
    /// Anchor text not found.
    AnchorNotFound,
    /// Anchor text found more than once.
    AnchorAmbiguous,
    /// Anchor overlaps a change applied earlier in the run.
    AnchorOverlap,
    /// Document structure at the anchor cannot be edited safely.
    DocumentFormat,
}

impl PatchStatus {
    /// Stable label used in tabular artifacts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyApplied => "already_applied",
            Self::Malformed => "malformed",
            Self::GateFailed => "gate_failed",
            Self::AnchorNotFound => "anchor_not_found",
            Self::AnchorAmbiguous => "anchor_ambiguous",
            Self::AnchorOverlap => "anchor_overlap",
            Self::DocumentFormat => "document_format",
        }
    }

    /// Returns true when the status wrote a tracked change.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

// ============================================================================
// SECTION: Audit Entry
// ============================================================================

/// One patch's audit record.
///
/// # Invariants
/// - Exactly one entry per input record (`position`) per run.
/// - `applied` is true iff `status` is [`PatchStatus::Applied`].
/// - When not applied, `after_text` equals `before_text` unless the change
///   was already present ([`PatchStatus::AlreadyApplied`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Patch identifier.
    pub patch_id: PatchId,
    /// Record position in the input batch.
    pub position: usize,
    /// Question the patch answers to, when known.
    pub question_id: Option<QuestionId>,
    /// Gate outcome for the question; absent for malformed records.
    pub gate_outcome: Option<GateOutcome>,
    /// Final disposition.
    pub status: PatchStatus,
    /// True when a tracked change was written.
    pub applied: bool,
    /// Editorial reason from the patch.
    pub reason: String,
    /// Explanation for the disposition.
    pub detail: String,
    /// Evidence cited by the patch, in declared order.
    pub source_refs: Vec<SourceId>,
    /// Sources the gate consulted for the question.
    pub consulted_sources: Vec<SourceId>,
    /// Text before the run.
    pub before_text: String,
    /// Text after the run.
    pub after_text: String,
    /// Revision ids written for the patch.
    pub change_ids: Vec<u64>,
    /// Paragraph the patch touched, when located.
    pub paragraph_index: Option<usize>,
}

// ============================================================================
// SECTION: Projections
// ============================================================================

/// Column headers of the change audit table.
pub const CHANGE_AUDIT_HEADERS: [&str; 12] = [
    "patch_id",
    "position",
    "question_id",
    "gate_outcome",
    "status",
    "applied",
    "before_text",
    "after_text",
    "reason",
    "source_refs",
    "change_ids",
    "detail",
];

/// Column headers of the question-to-source table.
pub const QUESTION_SOURCE_HEADERS: [&str; 6] = [
    "question_id",
    "outcome",
    "consulted_sources",
    "has_sources",
    "patches_total",
    "patches_applied",
];

/// Change audit row, one per patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeAuditRow {
    /// Patch identifier.
    pub patch_id: String,
    /// Record position in the input batch.
    pub position: usize,
    /// Question identifier, empty when unknown.
    pub question_id: String,
    /// `pass`, `fail`, or empty when not gated.
    pub gate_outcome: String,
    /// Disposition label.
    pub status: String,
    /// Applied flag.
    pub applied: bool,
    /// Text before the run.
    pub before_text: String,
    /// Text after the run.
    pub after_text: String,
    /// Editorial reason.
    pub reason: String,
    /// Source refs joined with `;`.
    pub source_refs: String,
    /// Revision ids joined with `;`.
    pub change_ids: String,
    /// Disposition detail.
    pub detail: String,
}

/// Question-to-source row, one per question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSourceRow {
    /// Question identifier.
    pub question_id: String,
    /// `pass`, `fail`, or `not_evaluated`.
    pub outcome: String,
    /// Every source consulted, joined with `;`.
    pub consulted_sources: String,
    /// True when at least one source was consulted.
    pub has_sources: bool,
    /// Patches recorded for the question.
    pub patches_total: usize,
    /// Patches applied for the question.
    pub patches_applied: usize,
}
