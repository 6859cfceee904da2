// crates/revision-gate-core/src/core/revision.rs
// ============================================================================
// Module: Revision Gate Anchors and Tracked Changes
// Description: Located text spans and the tracked changes written over them.
// Purpose: Carry exact run-level offsets from the locator to the mutator.
// Dependencies: crate::core::{document, identifiers}, serde
// ============================================================================

//! ## Overview
//! A [`DocumentAnchor`] pins a patch's anchor text to one paragraph and lists
//! every paragraph item the text touches with offsets inside that item. The
//! mutator consumes the anchor and returns a [`TrackedChange`] describing what
//! it wrote. Offsets count Unicode scalar values of visible text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::document::Markup;
use crate::core::identifiers::PatchId;

// ============================================================================
// SECTION: Anchors
// ============================================================================

/// Portion of one paragraph item covered by an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpan {
    /// Index of the item within the paragraph.
    pub run_index: usize,
    /// First covered character within the item's visible text.
    pub char_start: usize,
    /// One past the last covered character.
    pub char_end: usize,
}

/// Located anchor text.
///
/// # Invariants
/// - `run_spans` is ordered by `run_index` and non-empty.
/// - `text_start < text_end`, both in paragraph visible-text characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAnchor {
    /// Index among the document's paragraphs.
    pub paragraph_index: usize,
    /// Start offset in the paragraph's visible text.
    pub text_start: usize,
    /// End offset in the paragraph's visible text.
    pub text_end: usize,
    /// Covered items with per-item offsets.
    pub run_spans: Vec<RunSpan>,
}

impl DocumentAnchor {
    /// Anchor length in characters.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.text_end.saturating_sub(self.text_start)
    }

    /// Returns true for an empty span.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text_end <= self.text_start
    }

    /// Returns true when two anchors share at least one character.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.paragraph_index == other.paragraph_index
            && self.text_start < other.text_end
            && other.text_start < self.text_end
    }
}

/// Outcome of locating a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateOutcome {
    /// Anchor found exactly once.
    Located(DocumentAnchor),
    /// The document already carries this patch as a tracked change.
    AlreadyApplied {
        /// Paragraph holding the earlier change.
        paragraph_index: usize,
    },
}

// ============================================================================
// SECTION: Tracked Changes
// ============================================================================

/// Tracked change written by the mutator.
///
/// # Invariants
/// - `change_id` (deletion) and `insertion_id` are unique within the document.
/// - Immutable once written; acceptance or rejection happens downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChange {
    /// Patch that produced the change.
    pub patch_id: PatchId,
    /// Revision id of the deletion.
    pub change_id: u64,
    /// Revision id of the insertion, absent for pure deletions.
    pub insertion_id: Option<u64>,
    /// Author identity.
    pub author: String,
    /// RFC 3339 date.
    pub timestamp: String,
    /// Span that was marked deleted.
    pub deleted_span: DocumentAnchor,
    /// Text marked deleted.
    pub deleted_text: String,
    /// Text inserted.
    pub inserted_text: String,
    /// Formatting the insertion inherited.
    pub original_formatting: Option<Markup>,
    /// Footnote ids referenced from the insertion.
    pub footnote_ids: Vec<u32>,
    /// Zero-width items moved behind the insertion.
    pub relocated_items: usize,
}
