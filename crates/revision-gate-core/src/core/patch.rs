// crates/revision-gate-core/src/core/patch.rs
// ============================================================================
// Module: Revision Gate Patch Model
// Description: Typed proposed revisions and their validation errors.
// Purpose: Represent one evidence-backed edit from anchor text to replacement.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`PatchSpec`] is the validated form of one declarative patch record. Only
//! the loader constructs them, so every instance satisfies the field rules:
//! non-empty anchor, defined replacement, non-empty reason, and at least one
//! resolvable source reference. Records that break a rule become a
//! [`RejectedPatch`] carrying every violation found, not just the first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::PatchId;
use crate::core::identifiers::QuestionId;
use crate::core::identifiers::SourceId;

// ============================================================================
// SECTION: Patch Types
// ============================================================================

/// Edit performed at the anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOperation {
    /// Delete the anchor and insert the replacement.
    #[default]
    Replace,
    /// Delete the anchor only; the replacement must be empty.
    Delete,
}

/// Footnote reference to emit after the replacement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FootnoteRef {
    /// Existing footnote in the document, by id.
    Existing(u32),
    /// New footnote whose text comes from the batch's footnote sources.
    New(String),
}

impl fmt::Display for FootnoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing(id) => write!(f, "fnid:{id}"),
            Self::New(key) => write!(f, "fn:{key}"),
        }
    }
}

/// Validated proposed revision.
///
/// # Invariants
/// - `anchor`, `reason`, and `question_id` are non-empty.
/// - `source_refs` is non-empty, duplicate-free, and resolves in the registry
///   the batch was loaded against.
/// - `replacement` is non-empty for [`PatchOperation::Replace`] and empty for
///   [`PatchOperation::Delete`].
/// - `position` is the record's index in the input batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    /// Patch identifier.
    pub patch_id: PatchId,
    /// Position in the input batch.
    pub position: usize,
    /// Question the patch answers to.
    pub question_id: QuestionId,
    /// Edit kind.
    pub operation: PatchOperation,
    /// Exact text to replace.
    pub anchor: String,
    /// Text to insert.
    pub replacement: String,
    /// Editorial reason recorded in the audit.
    pub reason: String,
    /// Evidence sources, in declared order.
    pub source_refs: Vec<SourceId>,
    /// Footnote references to emit after the replacement.
    pub footnote_refs: Vec<FootnoteRef>,
    /// Text the nearest preceding non-empty paragraph must contain.
    pub question_anchor: Option<String>,
}

/// Validated batch plus the records it had to reject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchBatch {
    /// Valid patches in input order.
    pub patches: Vec<PatchSpec>,
    /// Invalid records in input order.
    pub rejected: Vec<RejectedPatch>,
    /// Footnote texts keyed by the `fn:<key>` token.
    pub footnote_sources: BTreeMap<String, String>,
}

impl PatchBatch {
    /// Total number of records in the input.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.patches.len() + self.rejected.len()
    }
}

/// A record that failed validation, with whatever fields could be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPatch {
    /// Patch identifier (declared or positional).
    pub patch_id: PatchId,
    /// Question id, when the record carried a usable one.
    pub question_id: Option<QuestionId>,
    /// Anchor text as supplied.
    pub anchor: String,
    /// Reason text as supplied.
    pub reason: String,
    /// Source refs as supplied.
    pub source_refs: Vec<SourceId>,
    /// Validation failure.
    pub error: MalformedPatchSpecError,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// One broken field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field name as it appears in the input.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldViolation {
    /// Creates a violation.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Structurally invalid patch record.
///
/// # Invariants
/// - `violations` is non-empty and lists every rule the record broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed patch {patch_id} (record {position}): {}", render_violations(.violations))]
pub struct MalformedPatchSpecError {
    /// Patch identifier (declared or positional).
    pub patch_id: PatchId,
    /// Index of the record in the input batch.
    pub position: usize,
    /// Violations found.
    pub violations: Vec<FieldViolation>,
}

/// Joins violations for display.
fn render_violations(violations: &[FieldViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
