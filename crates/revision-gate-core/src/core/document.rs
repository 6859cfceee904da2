// crates/revision-gate-core/src/core/document.rs
// ============================================================================
// Module: Revision Gate Document Model
// Description: Paragraph/run tree for word-processor documents with tracked changes.
// Purpose: Give the locator and mutator a format-agnostic tree to work on.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A document is an ordered sequence of blocks. Paragraph blocks are parsed
//! down to runs, because formatting boundaries fragment text across runs and
//! the mutator has to split them precisely. Everything the core does not
//! interpret (tables, section properties, run formatting, bookmarks) travels
//! as [`Markup`]: opaque serialized fragments that the codec wrote and will
//! write back unchanged.
//!
//! Visible text of a paragraph is the text a reader sees with tracked changes
//! shown inline: plain runs and tracked insertions contribute, tracked
//! deletions do not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Markup
// ============================================================================

/// Opaque serialized fragment owned by the document codec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markup(String);

impl Markup {
    /// Wraps a serialized fragment.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the fragment.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the fragment is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// SECTION: Document
// ============================================================================

/// Parsed document body plus the footnote table.
///
/// # Invariants
/// - `next_revision_id` is greater than every revision id already present in
///   the document lineage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Body blocks in document order.
    pub blocks: Vec<Block>,
    /// Footnote texts and footnotes appended during the run.
    pub footnotes: FootnoteTable,
    /// Next free revision identifier.
    pub next_revision_id: u64,
    /// Run formatting for newly created footnote reference runs.
    pub footnote_reference_properties: Option<Markup>,
    /// Tracked changes present when the document was read.
    pub baseline_changes: TrackedChangeCounts,
}

impl Document {
    /// Number of paragraph blocks.
    #[must_use]
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    /// Iterates paragraph blocks in document order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph),
            Block::Markup(_) => None,
        })
    }

    /// Returns the paragraph at a paragraph index.
    #[must_use]
    pub fn paragraph(&self, index: usize) -> Option<&Paragraph> {
        self.paragraphs().nth(index)
    }

    /// Returns the paragraph at a paragraph index for mutation.
    pub fn paragraph_mut(&mut self, index: usize) -> Option<&mut Paragraph> {
        self.blocks
            .iter_mut()
            .filter_map(|block| match block {
                Block::Paragraph(paragraph) => Some(paragraph),
                Block::Markup(_) => None,
            })
            .nth(index)
    }

    /// Counts tracked insertions and deletions currently in paragraph items.
    #[must_use]
    pub fn tracked_change_counts(&self) -> TrackedChangeCounts {
        let mut counts = TrackedChangeCounts::default();
        for paragraph in self.paragraphs() {
            for item in &paragraph.items {
                match item {
                    ParagraphItem::Insertion(_) => counts.insertions += 1,
                    ParagraphItem::Deletion(_) => counts.deletions += 1,
                    ParagraphItem::Run(_) | ParagraphItem::Opaque(_) => {}
                }
            }
        }
        counts
    }
}

/// Insertion and deletion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChangeCounts {
    /// Tracked insertions.
    pub insertions: usize,
    /// Tracked deletions.
    pub deletions: usize,
}

impl TrackedChangeCounts {
    /// Returns true when there are no tracked changes.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.insertions == 0 && self.deletions == 0
    }
}

/// Body block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Parsed paragraph.
    Paragraph(Paragraph),
    /// Uninterpreted markup between paragraphs (table scaffolding, section properties).
    Markup(Markup),
}

// ============================================================================
// SECTION: Paragraphs
// ============================================================================

/// Paragraph with its properties and inline items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    /// Attributes of the paragraph element.
    pub attributes: Markup,
    /// Paragraph properties.
    pub properties: Option<Markup>,
    /// Inline items in order.
    pub items: Vec<ParagraphItem>,
}

impl Paragraph {
    /// Visible text with tracked changes shown inline.
    #[must_use]
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                ParagraphItem::Run(run) => out.push_str(&run.visible_text()),
                ParagraphItem::Insertion(revision) => out.push_str(&revision.visible_text()),
                ParagraphItem::Opaque(opaque) => out.push_str(&opaque.text),
                ParagraphItem::Deletion(_) => {}
            }
        }
        out
    }
}

/// Inline paragraph item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParagraphItem {
    /// Plain run.
    Run(Run),
    /// Tracked insertion.
    Insertion(Revision),
    /// Tracked deletion.
    Deletion(Revision),
    /// Construct the core does not split (hyperlink, bookmark, field, content control).
    Opaque(OpaqueItem),
}

/// Uninterpreted inline construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueItem {
    /// Serialized construct.
    pub markup: Markup,
    /// Text it displays; empty for zero-width markers.
    pub text: String,
}

/// Tracked insertion or deletion wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Revision identifier.
    pub id: u64,
    /// Author identity.
    pub author: String,
    /// RFC 3339 date, when recorded.
    pub date: Option<String>,
    /// Wrapped runs.
    pub runs: Vec<Run>,
}

impl Revision {
    /// Visible text of the wrapped runs.
    #[must_use]
    pub fn visible_text(&self) -> String {
        self.runs.iter().map(Run::visible_text).collect()
    }

    /// Text removed by a deletion wrapper.
    #[must_use]
    pub fn deleted_text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            for content in &run.content {
                match content {
                    RunContent::DeletedText(text) => out.push_str(text),
                    RunContent::Tab => out.push('\t'),
                    RunContent::Break(_) => out.push('\n'),
                    _ => {}
                }
            }
        }
        out
    }
}

// ============================================================================
// SECTION: Runs
// ============================================================================

/// Formatted text leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    /// Attributes of the run element.
    pub attributes: Markup,
    /// Run formatting.
    pub properties: Option<Markup>,
    /// Content in order.
    pub content: Vec<RunContent>,
}

impl Run {
    /// Creates a plain text run with the given formatting.
    #[must_use]
    pub fn text(properties: Option<Markup>, text: impl Into<String>) -> Self {
        Self {
            attributes: Markup::default(),
            properties,
            content: vec![RunContent::Text(text.into())],
        }
    }

    /// Visible text of the run.
    #[must_use]
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        for content in &self.content {
            if let Some(text) = content.visible_text() {
                out.push_str(text);
            }
        }
        out
    }

    /// Returns true when the run contains a footnote reference.
    #[must_use]
    pub fn has_footnote_reference(&self) -> bool {
        self.content.iter().any(|content| matches!(content, RunContent::FootnoteReference { .. }))
    }
}

/// Field character role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCharKind {
    /// Field start.
    Begin,
    /// Separator between instruction and result.
    Separate,
    /// Field end.
    End,
}

/// Run content element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunContent {
    /// Visible text.
    Text(String),
    /// Text inside a tracked deletion.
    DeletedText(String),
    /// Tab character.
    Tab,
    /// Line or page break.
    Break(Markup),
    /// Footnote reference marker.
    FootnoteReference {
        /// Referenced footnote id.
        id: u32,
        /// Serialized marker.
        markup: Markup,
    },
    /// Complex field boundary.
    FieldChar {
        /// Boundary role.
        kind: FieldCharKind,
        /// Serialized element.
        markup: Markup,
    },
    /// Field instruction text.
    FieldInstruction(Markup),
    /// Rendering hint that carries no content (for example a page-break cache).
    LayoutHint(Markup),
    /// Anything else (drawings, symbols, embedded objects).
    Other(Markup),
}

impl RunContent {
    /// Text the element displays, if any.
    #[must_use]
    pub fn visible_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Tab => Some("\t"),
            Self::Break(_) => Some("\n"),
            Self::DeletedText(_)
            | Self::FootnoteReference {
                ..
            }
            | Self::FieldChar {
                ..
            }
            | Self::FieldInstruction(_)
            | Self::LayoutHint(_)
            | Self::Other(_) => None,
        }
    }
}

// ============================================================================
// SECTION: Footnotes
// ============================================================================

/// Footnote added by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footnote {
    /// Footnote identifier.
    pub id: u32,
    /// Footnote-source key the footnote was created for.
    pub key: String,
    /// Footnote text.
    pub text: String,
}

/// Footnote texts by id, plus footnotes appended during the run.
///
/// # Invariants
/// - A footnote-source key is allocated at most once; later references to
///   the same key reuse its id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FootnoteTable {
    /// Existing and appended footnotes by id.
    entries: BTreeMap<u32, String>,
    /// Footnotes appended during the run, in allocation order.
    appended: Vec<Footnote>,
}

impl FootnoteTable {
    /// Builds a table from existing footnotes.
    #[must_use]
    pub fn from_existing(entries: BTreeMap<u32, String>) -> Self {
        Self {
            entries,
            appended: Vec::new(),
        }
    }

    /// Returns true when a footnote id exists.
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns a footnote's text.
    #[must_use]
    pub fn text(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Highest footnote id in use.
    #[must_use]
    pub fn max_id(&self) -> Option<u32> {
        self.entries.keys().next_back().copied()
    }

    /// Returns the id for a footnote-source key, allocating the next id above
    /// the current maximum the first time the key is seen.
    pub fn allocate(&mut self, key: &str, text: &str) -> u32 {
        if let Some(existing) = self.appended.iter().find(|footnote| footnote.key == key) {
            return existing.id;
        }
        let id = self.max_id().map_or(1, |max| max.saturating_add(1));
        self.entries.insert(id, text.to_string());
        self.appended.push(Footnote {
            id,
            key: key.to_string(),
            text: text.to_string(),
        });
        id
    }

    /// Footnotes appended during the run.
    #[must_use]
    pub fn appended(&self) -> &[Footnote] {
        &self.appended
    }
}
