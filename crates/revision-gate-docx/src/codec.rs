// crates/revision-gate-docx/src/codec.rs
// ============================================================================
// Module: DOCX Codec
// Description: `.docx` package reader/writer implementing the core codec seam.
// Purpose: Decode packages into the document tree and write revised packages.
// Dependencies: revision-gate-core, zip, tracing
// ============================================================================

//! ## Overview
//! Decoding reads `word/document.xml` (required) and `word/footnotes.xml`
//! (optional), parses the body, collects footnote texts, and derives the next
//! free revision id and the baseline tracked-change counts.
//!
//! Encoding re-reads the original package, rewrites only the two parts the
//! tree models, and copies every other entry without recompressing it.
//! Entry order is preserved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::Write;

use revision_gate_core::Block;
use revision_gate_core::CodecError;
use revision_gate_core::Document;
use revision_gate_core::DocumentCodec;
use revision_gate_core::FootnoteTable;
use revision_gate_core::Markup;
use revision_gate_core::ParagraphItem;
use revision_gate_core::TrackedChangeCounts;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use crate::body::parse_body;
use crate::error::DocxError;
use crate::error::parse_error;
use crate::error::write_error;
use crate::footnotes::DEFAULT_REFERENCE_PROPERTIES;
use crate::footnotes::parse_footnotes;
use crate::footnotes::write_footnotes;
use crate::revisions::scan;
use crate::writer::write_body;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Main document part.
pub const DOCUMENT_PART: &str = "word/document.xml";
/// Footnote part.
pub const FOOTNOTES_PART: &str = "word/footnotes.xml";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Limits applied to untrusted packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxCodecConfig {
    /// Largest uncompressed part the codec reads.
    pub max_part_bytes: usize,
    /// Most entries a package may contain.
    pub max_entries: usize,
}

impl Default for DocxCodecConfig {
    fn default() -> Self {
        Self {
            max_part_bytes: 64 * 1024 * 1024,
            max_entries: 10_000,
        }
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// `.docx` codec.
#[derive(Debug, Clone, Default)]
pub struct DocxCodec {
    /// Package limits.
    config: DocxCodecConfig,
}

/// Sources of the parts the codec models.
struct PackageParts {
    /// Main document part.
    document: String,
    /// Footnote part, when present.
    footnotes: Option<String>,
}

impl DocxCodec {
    /// Creates a codec with explicit limits.
    #[must_use]
    pub const fn new(config: DocxCodecConfig) -> Self {
        Self {
            config,
        }
    }

    /// Parses a package into the document tree.
    ///
    /// # Errors
    ///
    /// Returns [`DocxError`] when the package or its XML cannot be read.
    pub fn read(&self, bytes: &[u8]) -> Result<Document, DocxError> {
        let parts = self.read_parts(bytes)?;
        let body = parse_body(DOCUMENT_PART, &parts.document)?;
        let document_scan = scan(DOCUMENT_PART, &parts.document)?;
        let (footnotes, footnote_max_id) = match &parts.footnotes {
            Some(source) => {
                let part = parse_footnotes(FOOTNOTES_PART, source)?;
                (part.entries, scan(FOOTNOTES_PART, source)?.max_id)
            }
            None => (BTreeMap::new(), None),
        };
        let blocks: Vec<Block> = body.blocks.into_iter().map(|parsed| parsed.block).collect();
        let footnote_reference_properties = reference_properties(&blocks)
            .or_else(|| Some(Markup::new(DEFAULT_REFERENCE_PROPERTIES)));
        let next_revision_id =
            document_scan.max_id.max(footnote_max_id).map_or(1, |id| id.saturating_add(1));

        let document = Document {
            blocks,
            footnotes: FootnoteTable::from_existing(footnotes),
            next_revision_id,
            footnote_reference_properties,
            baseline_changes: TrackedChangeCounts {
                insertions: document_scan.insertions,
                deletions: document_scan.deletions,
            },
        };
        debug!(
            paragraphs = document.paragraph_count(),
            next_revision_id,
            baseline_insertions = document_scan.insertions,
            baseline_deletions = document_scan.deletions,
            "docx decoded"
        );
        Ok(document)
    }

    /// Writes the revised tree into a copy of the original package.
    ///
    /// # Errors
    ///
    /// Returns [`DocxError`] when the original cannot be re-read, the tree no
    /// longer lines up with it, or the package cannot be written.
    pub fn write(&self, original: &[u8], document: &Document) -> Result<Vec<u8>, DocxError> {
        let parts = self.read_parts(original)?;
        let body = parse_body(DOCUMENT_PART, &parts.document)?;
        let (document_xml, rewritten) = write_body(DOCUMENT_PART, &body, document)?;
        let appended = document.footnotes.appended();
        let footnotes_xml = match (&parts.footnotes, appended.is_empty()) {
            (_, true) => None,
            (Some(source), false) => {
                let part = parse_footnotes(FOOTNOTES_PART, source)?;
                let properties = document.footnote_reference_properties.as_ref();
                Some(write_footnotes(&part, appended, properties))
            }
            (None, false) => return Err(DocxError::MissingPart(FOOTNOTES_PART.to_string())),
        };

        let mut archive = open_archive(original)?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for index in 0 .. archive.len() {
            let entry = archive.by_index_raw(index).map_err(package_error)?;
            let replacement = match entry.name() {
                DOCUMENT_PART => Some(document_xml.as_bytes()),
                FOOTNOTES_PART => footnotes_xml.as_deref().map(str::as_bytes),
                _ => None,
            };
            match replacement {
                Some(bytes) => {
                    let name = entry.name().to_string();
                    writer.start_file(name, options).map_err(package_error)?;
                    writer.write_all(bytes).map_err(|err| DocxError::Package(err.to_string()))?;
                }
                None => writer.raw_copy_file(entry).map_err(package_error)?,
            }
        }
        let bytes = writer.finish().map_err(package_error)?.into_inner();
        debug!(rewritten_blocks = rewritten, footnotes_added = appended.len(), "docx encoded");
        Ok(bytes)
    }

    /// Reads the modeled parts, enforcing limits.
    fn read_parts(&self, bytes: &[u8]) -> Result<PackageParts, DocxError> {
        let mut archive = open_archive(bytes)?;
        if archive.len() > self.config.max_entries {
            return Err(DocxError::Package(format!(
                "package has {} entries, limit is {}",
                archive.len(),
                self.config.max_entries
            )));
        }
        let document = read_part(&mut archive, DOCUMENT_PART, self.config.max_part_bytes)?
            .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))?;
        let footnotes = read_part(&mut archive, FOOTNOTES_PART, self.config.max_part_bytes)?;
        Ok(PackageParts {
            document,
            footnotes,
        })
    }
}

impl DocumentCodec for DocxCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Document, CodecError> {
        self.read(bytes).map_err(parse_error)
    }

    fn encode(&self, original: &[u8], document: &Document) -> Result<Vec<u8>, CodecError> {
        self.write(original, document).map_err(write_error)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens a package held in memory.
fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, DocxError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(package_error)
}

/// Reads one part as UTF-8, or `None` when the package lacks it.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    max_bytes: usize,
) -> Result<Option<String>, DocxError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(package_error(err)),
    };
    let too_large = || DocxError::PartTooLarge {
        part: name.to_string(),
        max_bytes,
    };
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if entry.size() > limit {
        return Err(too_large());
    }
    let mut text = String::new();
    entry
        .take(limit.saturating_add(1))
        .read_to_string(&mut text)
        .map_err(|err| DocxError::Package(format!("{name}: {err}")))?;
    if text.len() > max_bytes {
        return Err(too_large());
    }
    Ok(Some(text))
}

/// Formatting of the first footnote reference run in the body.
fn reference_properties(blocks: &[Block]) -> Option<Markup> {
    blocks
        .iter()
        .filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph),
            Block::Markup(_) => None,
        })
        .flat_map(|paragraph| paragraph.items.iter())
        .find_map(|item| match item {
            ParagraphItem::Run(run) if run.has_footnote_reference() => run.properties.clone(),
            _ => None,
        })
}

/// Wraps a zip error.
fn package_error(err: ZipError) -> DocxError {
    DocxError::Package(err.to_string())
}
