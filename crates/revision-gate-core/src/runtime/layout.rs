// crates/revision-gate-core/src/runtime/layout.rs
// ============================================================================
// Module: Revision Gate Paragraph Layout
// Description: Character-level map from paragraph visible text to items.
// Purpose: Share one offset model between the locator and the mutator.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A [`ParagraphLayout`] flattens a paragraph's visible text into characters
//! and remembers, for each character, which item produced it and at what
//! offset inside that item. Complex-field nesting is tracked so callers can
//! refuse to edit inside field results.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::FieldCharKind;
use crate::core::Paragraph;
use crate::core::ParagraphItem;
use crate::core::Run;
use crate::core::RunContent;
use crate::core::RunSpan;

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Origin of one visible character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CharSlot {
    /// Item index within the paragraph.
    pub item_index: usize,
    /// Character offset within the item's visible text.
    pub item_offset: usize,
    /// True when the character sits inside a complex field.
    pub in_field: bool,
}

/// Visible extent of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ItemExtent {
    /// First paragraph offset covered by the item.
    pub start: usize,
    /// Number of visible characters.
    pub width: usize,
}

impl ItemExtent {
    /// One past the last covered offset.
    pub const fn end(self) -> usize {
        self.start + self.width
    }
}

/// Flattened view of a paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParagraphLayout {
    /// Visible characters.
    pub chars: Vec<char>,
    /// One slot per character.
    pub slots: Vec<CharSlot>,
    /// One extent per item.
    pub extents: Vec<ItemExtent>,
}

impl ParagraphLayout {
    /// Builds the layout of a paragraph.
    pub fn of(paragraph: &Paragraph) -> Self {
        let mut layout = Self::default();
        let mut depth = 0_usize;
        for (item_index, item) in paragraph.items.iter().enumerate() {
            let start = layout.chars.len();
            match item {
                ParagraphItem::Run(run) => {
                    layout.push_run(item_index, 0, run, &mut depth);
                }
                ParagraphItem::Insertion(revision) => {
                    let mut offset = 0;
                    for run in &revision.runs {
                        offset = layout.push_run(item_index, offset, run, &mut depth);
                    }
                }
                ParagraphItem::Opaque(opaque) => {
                    for (item_offset, ch) in opaque.text.chars().enumerate() {
                        layout.push_char(ch, item_index, item_offset, depth > 0);
                    }
                }
                ParagraphItem::Deletion(_) => {}
            }
            layout.extents.push(ItemExtent {
                start,
                width: layout.chars.len() - start,
            });
        }
        layout
    }

    /// Visible text as a string.
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Start offsets of every occurrence of `needle`, overlaps included.
    pub fn find_all(&self, needle: &[char]) -> Vec<usize> {
        if needle.is_empty() || needle.len() > self.chars.len() {
            return Vec::new();
        }
        self.chars
            .windows(needle.len())
            .enumerate()
            .filter(|(_, window)| *window == needle)
            .map(|(start, _)| start)
            .collect()
    }

    /// Text of a character range, if the range is in bounds.
    pub fn slice(&self, start: usize, end: usize) -> Option<String> {
        if start > end || end > self.chars.len() {
            return None;
        }
        Some(self.chars[start .. end].iter().collect())
    }

    /// Per-item spans covering `start .. end`.
    pub fn run_spans(&self, start: usize, end: usize) -> Vec<RunSpan> {
        let mut spans: Vec<RunSpan> = Vec::new();
        for slot in self.slots.iter().take(end).skip(start) {
            match spans.last_mut() {
                Some(span) if span.run_index == slot.item_index => {
                    span.char_end = slot.item_offset + 1;
                }
                _ => spans.push(RunSpan {
                    run_index: slot.item_index,
                    char_start: slot.item_offset,
                    char_end: slot.item_offset + 1,
                }),
            }
        }
        spans
    }

    /// Returns true when any character of the range sits inside a field.
    pub fn touches_field(&self, start: usize, end: usize) -> bool {
        self.slots.iter().take(end).skip(start).any(|slot| slot.in_field)
    }

    /// Appends the visible characters of one run, returning the next item offset.
    fn push_run(
        &mut self,
        item_index: usize,
        offset: usize,
        run: &Run,
        depth: &mut usize,
    ) -> usize {
        let mut offset = offset;
        for content in &run.content {
            match content {
                RunContent::FieldChar {
                    kind: FieldCharKind::Begin,
                    ..
                } => *depth += 1,
                RunContent::FieldChar {
                    kind: FieldCharKind::End,
                    ..
                } => *depth = depth.saturating_sub(1),
                _ => {}
            }
            if let Some(text) = content.visible_text() {
                for ch in text.chars() {
                    self.push_char(ch, item_index, offset, *depth > 0);
                    offset += 1;
                }
            }
        }
        offset
    }

    fn push_char(&mut self, ch: char, item_index: usize, item_offset: usize, in_field: bool) {
        self.chars.push(ch);
        self.slots.push(CharSlot {
            item_index,
            item_offset,
            in_field,
        });
    }
}
