// crates/revision-gate-core/src/runtime/mutator.rs
// ============================================================================
// Module: Revision Gate Tracked-Change Mutator
// Description: Rewrites a located span as a tracked deletion plus insertion.
// Purpose: Edit the document tree without losing formatting or footnote links.
// Dependencies: crate::core, crate::runtime::layout, thiserror, tracing
// ============================================================================

//! ## Overview
//! The mutator splits the runs at the anchor boundaries, wraps the covered
//! fragments in a deletion, and places an insertion carrying the replacement
//! (and any requested footnote references) right after it. Footnote
//! references and zero-width markers found inside the span are moved behind
//! the insertion in their original order. A footnote reference touching the
//! start of the span moves with them; one touching the end already follows
//! the insertion.
//!
//! Every patch is applied to copies of the paragraph, footnote table, and
//! revision counter. The document is only touched once all steps succeed, so
//! a failing patch leaves no trace.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::core::Document;
use crate::core::DocumentAnchor;
use crate::core::FootnoteRef;
use crate::core::FootnoteTable;
use crate::core::Markup;
use crate::core::ParagraphItem;
use crate::core::PatchOperation;
use crate::core::PatchSpec;
use crate::core::Revision;
use crate::core::Run;
use crate::core::RunContent;
use crate::core::RunContext;
use crate::core::TimeError;
use crate::core::TrackedChange;
use crate::runtime::layout::ItemExtent;
use crate::runtime::layout::ParagraphLayout;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Document structure at the anchor cannot be edited safely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported document structure in paragraph {paragraph_index}: {message}")]
pub struct DocumentFormatError {
    /// Paragraph the patch targeted.
    pub paragraph_index: usize,
    /// What blocked the edit.
    pub message: String,
}

impl DocumentFormatError {
    /// Creates a format error.
    #[must_use]
    pub fn new(paragraph_index: usize, message: impl Into<String>) -> Self {
        Self {
            paragraph_index,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Mutator
// ============================================================================

/// Writes tracked changes stamped with one run's author and date.
#[derive(Debug, Clone)]
pub struct TrackedChangeMutator<'a> {
    /// Author stamped on every change.
    author: String,
    /// RFC 3339 date stamped on every change.
    date: String,
    /// Texts for `fn:<key>` footnote references.
    footnote_sources: &'a BTreeMap<String, String>,
}

impl<'a> TrackedChangeMutator<'a> {
    /// Creates a mutator for a run.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError`] when the run timestamp cannot be rendered.
    pub fn new(
        context: &RunContext,
        footnote_sources: &'a BTreeMap<String, String>,
    ) -> Result<Self, TimeError> {
        Ok(Self {
            author: context.author.clone(),
            date: context.revision_date()?,
            footnote_sources,
        })
    }

    /// Applies one patch at a located anchor.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentFormatError`] when the span cannot be split safely or
    /// a footnote reference does not resolve. The document is unchanged.
    pub fn apply(
        &self,
        document: &mut Document,
        patch: &PatchSpec,
        anchor: &DocumentAnchor,
    ) -> Result<TrackedChange, DocumentFormatError> {
        let paragraph_index = anchor.paragraph_index;
        let fail = |message: &str| DocumentFormatError::new(paragraph_index, message);

        let paragraph =
            document.paragraph(paragraph_index).ok_or_else(|| fail("paragraph does not exist"))?;
        let layout = ParagraphLayout::of(paragraph);
        let (start, end) = (anchor.text_start, anchor.text_end);
        let deleted_text =
            layout.slice(start, end).ok_or_else(|| fail("anchor span is out of range"))?;
        if start == end {
            return Err(fail("anchor span is empty"));
        }
        if deleted_text != patch.anchor {
            return Err(fail("span text no longer matches the anchor"));
        }
        if layout.touches_field(start, end) {
            return Err(fail("anchor lies inside a field result"));
        }

        let mut footnotes = document.footnotes.clone();
        let mut next_id = document.next_revision_id;
        let footnote_ids = self.resolve_footnotes(&mut footnotes, patch, paragraph_index)?;
        let split = split_items(paragraph.items.clone(), &layout.extents, start, end)
            .map_err(fail)?;

        let change_id = next_id;
        next_id += 1;
        let mut items = split.before;
        items.push(ParagraphItem::Deletion(Revision {
            id: change_id,
            author: self.author.clone(),
            date: Some(self.date.clone()),
            runs: split.deleted,
        }));
        let insertion_id = if patch.operation == PatchOperation::Replace {
            let id = next_id;
            next_id += 1;
            let mut runs = vec![Run::text(split.formatting.clone(), patch.replacement.clone())];
            runs.extend(footnote_ids.iter().map(|footnote_id| {
                footnote_reference_run(document.footnote_reference_properties.clone(), *footnote_id)
            }));
            items.push(ParagraphItem::Insertion(Revision {
                id,
                author: self.author.clone(),
                date: Some(self.date.clone()),
                runs,
            }));
            Some(id)
        } else {
            None
        };
        let relocated_items = split.relocated.len();
        items.extend(split.relocated);
        items.extend(split.after);

        let target = document
            .paragraph_mut(paragraph_index)
            .ok_or_else(|| fail("paragraph does not exist"))?;
        target.items = items;
        document.footnotes = footnotes;
        document.next_revision_id = next_id;

        debug!(
            patch_id = %patch.patch_id,
            paragraph_index,
            change_id,
            relocated_items,
            "tracked change written"
        );
        Ok(TrackedChange {
            patch_id: patch.patch_id.clone(),
            change_id,
            insertion_id,
            author: self.author.clone(),
            timestamp: self.date.clone(),
            deleted_span: anchor.clone(),
            deleted_text,
            inserted_text: patch.replacement.clone(),
            original_formatting: split.formatting,
            footnote_ids,
            relocated_items,
        })
    }

    /// Resolves a patch's footnote references, allocating new footnotes.
    fn resolve_footnotes(
        &self,
        footnotes: &mut FootnoteTable,
        patch: &PatchSpec,
        paragraph_index: usize,
    ) -> Result<Vec<u32>, DocumentFormatError> {
        let mut ids = Vec::with_capacity(patch.footnote_refs.len());
        for reference in &patch.footnote_refs {
            let id = match reference {
                FootnoteRef::Existing(id) => {
                    if !footnotes.contains(*id) {
                        return Err(DocumentFormatError::new(
                            paragraph_index,
                            format!("footnote {id} does not exist"),
                        ));
                    }
                    *id
                }
                FootnoteRef::New(key) => {
                    let text = self.footnote_sources.get(key).ok_or_else(|| {
                        DocumentFormatError::new(
                            paragraph_index,
                            format!("footnote source {key} is not defined"),
                        )
                    })?;
                    footnotes.allocate(key, text)
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }
}

// ============================================================================
// SECTION: Splitting
// ============================================================================

/// Paragraph items partitioned around an anchor span.
#[derive(Debug, Default)]
struct SplitItems {
    /// Items before the span.
    before: Vec<ParagraphItem>,
    /// Covered run fragments, already converted to deleted content.
    deleted: Vec<Run>,
    /// Zero-width items moved behind the insertion.
    relocated: Vec<ParagraphItem>,
    /// Items after the span.
    after: Vec<ParagraphItem>,
    /// Formatting of the first covered text fragment.
    formatting: Option<Markup>,
}

/// Partitions items around `start .. end`, splitting boundary runs.
fn split_items(
    items: Vec<ParagraphItem>,
    extents: &[ItemExtent],
    start: usize,
    end: usize,
) -> Result<SplitItems, &'static str> {
    let mut split = SplitItems::default();
    for (item, extent) in items.into_iter().zip(extents.iter().copied()) {
        if extent.width == 0 {
            if extent.start == start && is_footnote_reference(&item) {
                split.relocated.push(item);
            } else if extent.start <= start {
                split.before.push(item);
            } else if extent.start >= end {
                split.after.push(item);
            } else {
                match item {
                    ParagraphItem::Run(run) => absorb_run(&mut split, run)?,
                    ParagraphItem::Opaque(_) => split.relocated.push(item),
                    ParagraphItem::Deletion(_) => {
                        return Err("anchor crosses an existing tracked deletion");
                    }
                    ParagraphItem::Insertion(_) => {
                        return Err("anchor crosses an existing tracked insertion");
                    }
                }
            }
            continue;
        }
        if extent.end() == start && is_footnote_reference(&item) {
            if let ParagraphItem::Run(run) = item {
                let (left, middle, _) = split_run(run, extent.start, start, end);
                if let Some(left) = left {
                    split.before.push(ParagraphItem::Run(left));
                }
                absorb_run(&mut split, middle)?;
            }
            continue;
        }
        if extent.end() <= start {
            split.before.push(item);
            continue;
        }
        if extent.start >= end {
            split.after.push(item);
            continue;
        }
        let run = match item {
            ParagraphItem::Run(run) => run,
            ParagraphItem::Insertion(_) => {
                return Err("anchor crosses an existing tracked insertion");
            }
            ParagraphItem::Deletion(_) => return Err("anchor crosses an existing tracked deletion"),
            ParagraphItem::Opaque(_) => return Err("anchor crosses content that cannot be split"),
        };
        let (left, middle, right) = split_run(run, extent.start, start, end);
        if let Some(left) = left {
            split.before.push(ParagraphItem::Run(left));
        }
        absorb_run(&mut split, middle)?;
        if let Some(right) = right {
            split.after.push(ParagraphItem::Run(right));
        }
    }
    Ok(split)
}

/// Converts a covered run fragment into deleted content.
fn absorb_run(split: &mut SplitItems, run: Run) -> Result<(), &'static str> {
    let mut deleted = Vec::with_capacity(run.content.len());
    let mut has_text = false;
    for content in run.content {
        match content {
            RunContent::Text(text) => {
                has_text = true;
                deleted.push(RunContent::DeletedText(text));
            }
            RunContent::Tab | RunContent::Break(_) | RunContent::LayoutHint(_) => {
                deleted.push(content);
            }
            RunContent::FootnoteReference {
                ..
            } => split.relocated.push(ParagraphItem::Run(Run {
                attributes: run.attributes.clone(),
                properties: run.properties.clone(),
                content: vec![content],
            })),
            RunContent::FieldChar {
                ..
            }
            | RunContent::FieldInstruction(_) => return Err("anchor crosses a field code"),
            RunContent::Other(_) => return Err("anchor crosses embedded content"),
            RunContent::DeletedText(_) => return Err("anchor crosses deleted text"),
        }
    }
    if has_text && split.formatting.is_none() {
        split.formatting = run.properties.clone();
    }
    if !deleted.is_empty() {
        split.deleted.push(Run {
            attributes: run.attributes,
            properties: run.properties,
            content: deleted,
        });
    }
    Ok(())
}

/// Splits a run starting at paragraph offset `run_start` into the parts
/// before, inside, and after `start .. end`.
fn split_run(
    run: Run,
    run_start: usize,
    start: usize,
    end: usize,
) -> (Option<Run>, Run, Option<Run>) {
    let mut left = Vec::new();
    let mut middle = Vec::new();
    let mut right = Vec::new();
    let mut position = run_start;
    for content in run.content {
        match content {
            RunContent::Text(text) => {
                let mut parts = [String::new(), String::new(), String::new()];
                for ch in text.chars() {
                    parts[bucket(position, start, end, true)].push(ch);
                    position += 1;
                }
                let [before, inside, after] = parts;
                let targets = [(&mut left, before), (&mut middle, inside), (&mut right, after)];
                for (target, part) in targets {
                    if !part.is_empty() {
                        target.push(RunContent::Text(part));
                    }
                }
            }
            RunContent::Tab | RunContent::Break(_) => {
                let target = match bucket(position, start, end, true) {
                    0 => &mut left,
                    1 => &mut middle,
                    _ => &mut right,
                };
                target.push(content);
                position += 1;
            }
            other => {
                let leading_reference = position == start
                    && matches!(other, RunContent::FootnoteReference { .. });
                let index = if leading_reference { 1 } else { bucket(position, start, end, false) };
                let target = match index {
                    0 => &mut left,
                    1 => &mut middle,
                    _ => &mut right,
                };
                target.push(other);
            }
        }
    }
    let fragment = |content: Vec<RunContent>| Run {
        attributes: run.attributes.clone(),
        properties: run.properties.clone(),
        content,
    };
    let left = (!left.is_empty()).then(|| fragment(left));
    let right = (!right.is_empty()).then(|| fragment(right));
    (left, fragment(middle), right)
}

/// Bucket index (0 before, 1 inside, 2 after) for a position.
///
/// Characters occupy `position .. position + 1`; zero-width content sits at
/// `position` and stays outside the span when it touches either boundary.
const fn bucket(position: usize, start: usize, end: usize, has_width: bool) -> usize {
    if has_width {
        if position < start {
            0
        } else if position < end {
            1
        } else {
            2
        }
    } else if position <= start {
        0
    } else if position >= end {
        2
    } else {
        1
    }
}

/// True for a run carrying a footnote reference.
fn is_footnote_reference(item: &ParagraphItem) -> bool {
    matches!(item, ParagraphItem::Run(run) if run.has_footnote_reference())
}

/// Creates a footnote reference run for an insertion.
fn footnote_reference_run(properties: Option<Markup>, id: u32) -> Run {
    Run {
        attributes: Markup::default(),
        properties,
        content: vec![RunContent::FootnoteReference {
            id,
            markup: Markup::default(),
        }],
    }
}
