// crates/revision-gate-core/src/runtime/locator.rs
// ============================================================================
// Module: Revision Gate Anchor Locator
// Description: Exact, unique anchor matching across run boundaries.
// Purpose: Pin each approved patch to one span or block it with a reason.
// Dependencies: crate::core, crate::runtime::layout, thiserror
// ============================================================================

//! ## Overview
//! The locator works on a frozen snapshot of the document: every paragraph's
//! visible text is flattened once, then each patch's anchor is searched for
//! as an exact substring. Zero matches and multiple matches both block the
//! patch; nothing is guessed.
//!
//! Before searching, the locator checks whether the document already carries
//! the patch as an adjacent deletion/insertion pair. Re-running a batch over
//! its own output therefore reports [`LocateOutcome::AlreadyApplied`] instead
//! of failing on the (now deleted) anchor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Document;
use crate::core::DocumentAnchor;
use crate::core::LocateOutcome;
use crate::core::Paragraph;
use crate::core::ParagraphItem;
use crate::core::PatchId;
use crate::core::PatchOperation;
use crate::core::PatchSpec;
use crate::runtime::layout::ParagraphLayout;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a patch could not be pinned to a single span.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    /// Anchor text does not occur.
    #[error("anchor not found: {anchor:?}")]
    AnchorNotFound {
        /// Anchor searched for.
        anchor: String,
    },
    /// Anchor text occurs more than once.
    #[error("anchor is ambiguous: {count} matches in paragraphs {paragraphs:?}")]
    AnchorAmbiguous {
        /// Number of matches.
        count: usize,
        /// Paragraph of each match, in document order.
        paragraphs: Vec<usize>,
    },
    /// Anchor overlaps a span an earlier patch already edited.
    #[error("anchor overlaps the span edited by {other}")]
    AnchorOverlap {
        /// Patch that edited the span first.
        other: PatchId,
    },
}

// ============================================================================
// SECTION: Locator
// ============================================================================

/// Anchor locator over one document snapshot.
#[derive(Debug, Clone)]
pub struct AnchorLocator<'a> {
    /// Paragraphs of the snapshot.
    paragraphs: Vec<&'a Paragraph>,
    /// Layout of each paragraph.
    layouts: Vec<ParagraphLayout>,
    /// Nearest preceding paragraph with non-blank text, per paragraph.
    context: Vec<Option<usize>>,
}

impl<'a> AnchorLocator<'a> {
    /// Flattens a document snapshot for searching.
    #[must_use]
    pub fn new(document: &'a Document) -> Self {
        let paragraphs: Vec<&Paragraph> = document.paragraphs().collect();
        let layouts: Vec<ParagraphLayout> =
            paragraphs.iter().map(|paragraph| ParagraphLayout::of(paragraph)).collect();
        let mut context = Vec::with_capacity(layouts.len());
        let mut last_non_blank = None;
        for (index, layout) in layouts.iter().enumerate() {
            context.push(last_non_blank);
            if !layout.text().trim().is_empty() {
                last_non_blank = Some(index);
            }
        }
        Self {
            paragraphs,
            layouts,
            context,
        }
    }

    /// Locates a patch's anchor.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::AnchorNotFound`] or [`LocateError::AnchorAmbiguous`]
    /// when the anchor does not occur exactly once among candidate paragraphs.
    pub fn locate(&self, patch: &PatchSpec) -> Result<LocateOutcome, LocateError> {
        let candidates: Vec<usize> =
            (0 .. self.layouts.len()).filter(|index| self.in_scope(*index, patch)).collect();

        if patch.operation == PatchOperation::Replace {
            if let Some(paragraph_index) = self.find_applied(&candidates, patch) {
                return Ok(LocateOutcome::AlreadyApplied {
                    paragraph_index,
                });
            }
        }

        let needle: Vec<char> = patch.anchor.chars().collect();
        let mut matches = Vec::new();
        for index in &candidates {
            for start in self.layouts[*index].find_all(&needle) {
                matches.push((*index, start));
            }
        }

        match matches.as_slice() {
            [] => {
                if patch.operation == PatchOperation::Delete {
                    if let Some(paragraph_index) = self.find_applied(&candidates, patch) {
                        return Ok(LocateOutcome::AlreadyApplied {
                            paragraph_index,
                        });
                    }
                }
                Err(LocateError::AnchorNotFound {
                    anchor: patch.anchor.clone(),
                })
            }
            [(paragraph_index, start)] => {
                let end = start + needle.len();
                Ok(LocateOutcome::Located(DocumentAnchor {
                    paragraph_index: *paragraph_index,
                    text_start: *start,
                    text_end: end,
                    run_spans: self.layouts[*paragraph_index].run_spans(*start, end),
                }))
            }
            many => Err(LocateError::AnchorAmbiguous {
                count: many.len(),
                paragraphs: many.iter().map(|(index, _)| *index).collect(),
            }),
        }
    }

    /// Returns true when a paragraph satisfies the patch's question anchor.
    fn in_scope(&self, index: usize, patch: &PatchSpec) -> bool {
        let Some(question_anchor) = &patch.question_anchor else {
            return true;
        };
        self.context
            .get(index)
            .copied()
            .flatten()
            .is_some_and(|heading| self.layouts[heading].text().contains(question_anchor.as_str()))
    }

    /// Finds a paragraph that already carries the patch as tracked changes.
    fn find_applied(&self, candidates: &[usize], patch: &PatchSpec) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .find(|index| carries_patch(self.paragraphs[*index], patch))
    }
}

/// Re-resolves a character range against the current document.
///
/// Returns `None` when the paragraph or range does not exist.
#[must_use]
pub fn resolve_span(
    document: &Document,
    paragraph_index: usize,
    text_start: usize,
    text_end: usize,
) -> Option<DocumentAnchor> {
    let paragraph = document.paragraph(paragraph_index)?;
    let layout = ParagraphLayout::of(paragraph);
    if text_start >= text_end || text_end > layout.chars.len() {
        return None;
    }
    Some(DocumentAnchor {
        paragraph_index,
        text_start,
        text_end,
        run_spans: layout.run_spans(text_start, text_end),
    })
}

// ============================================================================
// SECTION: Idempotence
// ============================================================================

/// Returns true when the paragraph holds the patch's deletion next to its insertion.
fn carries_patch(paragraph: &Paragraph, patch: &PatchSpec) -> bool {
    let deleted = |item: &ParagraphItem| {
        matches!(item, ParagraphItem::Deletion(revision) if revision.deleted_text() == patch.anchor)
    };
    if patch.operation == PatchOperation::Delete {
        return paragraph.items.iter().any(deleted);
    }
    let inserted = |item: &ParagraphItem| match item {
        ParagraphItem::Insertion(revision) => revision.visible_text() == patch.replacement,
        _ => false,
    };
    paragraph.items.windows(2).any(|pair| {
        (deleted(&pair[0]) && inserted(&pair[1])) || (inserted(&pair[0]) && deleted(&pair[1]))
    })
}
