// crates/revision-gate-docx/src/footnotes.rs
// ============================================================================
// Module: DOCX Footnote Part
// Description: Reads footnote texts and appends new footnotes.
// Purpose: Back the core footnote table with `word/footnotes.xml`.
// Dependencies: revision-gate-core, quick-xml
// ============================================================================

//! ## Overview
//! Footnotes with negative ids are never listed. New footnotes are inserted
//! right before the closing root tag, styled like the first regular footnote
//! in the part (its paragraph properties and the formatting of its
//! `w:footnoteRef` run), so the original part is otherwise untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use quick_xml::events::Event;
use revision_gate_core::Footnote;
use revision_gate_core::Markup;

use crate::error::DocxError;
use crate::xml::XmlCursor;
use crate::xml::escape_text;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Paragraph properties for new footnotes when no template exists.
const DEFAULT_PARAGRAPH_PROPERTIES: &str = "<w:pPr><w:pStyle w:val=\"FootnoteText\"/></w:pPr>";
/// Footnote mark formatting when neither the part nor the body offers one.
pub(crate) const DEFAULT_REFERENCE_PROPERTIES: &str =
    "<w:rPr><w:vertAlign w:val=\"superscript\"/></w:rPr>";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parsed footnote part.
#[derive(Debug, Clone)]
pub(crate) struct FootnotePart<'a> {
    /// Footnote texts by id.
    pub entries: BTreeMap<u32, String>,
    /// Part source.
    source: &'a str,
    /// Offset of the closing root tag.
    close_at: usize,
    /// Styling copied onto new footnotes.
    template: FootnoteTemplate,
}

/// Styling of the first regular footnote.
#[derive(Debug, Clone, Default)]
struct FootnoteTemplate {
    /// Paragraph properties.
    paragraph_properties: Option<String>,
    /// Formatting of the footnote mark run.
    reference_properties: Option<String>,
}

/// Content gathered from one footnote element.
#[derive(Debug, Default)]
struct FootnoteBody {
    /// Concatenated text.
    text: String,
    /// Paragraph properties of the first paragraph.
    paragraph_properties: Option<String>,
    /// Formatting of the run holding `w:footnoteRef`.
    reference_properties: Option<String>,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses the footnote part.
pub(crate) fn parse_footnotes<'a>(
    part: &'a str,
    source: &'a str,
) -> Result<FootnotePart<'a>, DocxError> {
    let mut cursor = XmlCursor::new(part, source);
    loop {
        let (event, ..) = cursor.next()?;
        match event {
            Event::Start(element) if element.local_name().as_ref() == b"footnotes" => {
                cursor.require_word_prefix(&element)?;
                break;
            }
            Event::Start(_) | Event::Empty(_) | Event::Eof => {
                return Err(DocxError::structure(part, "footnote part has no w:footnotes root"));
            }
            _ => {}
        }
    }

    let mut entries = BTreeMap::new();
    let mut template: Option<FootnoteTemplate> = None;
    loop {
        let (event, start, _) = cursor.next()?;
        match event {
            Event::Start(element) if element.local_name().as_ref() == b"footnote" => {
                let id =
                    cursor.attribute(&element, b"id")?.and_then(|value| value.parse::<i64>().ok());
                let separator = cursor.attribute(&element, b"type")?.is_some();
                let body = parse_footnote(&mut cursor)?;
                let Some(id) = id.and_then(|id| u32::try_from(id).ok()) else {
                    continue;
                };
                if !separator && template.is_none() {
                    template = Some(FootnoteTemplate {
                        paragraph_properties: body.paragraph_properties,
                        reference_properties: body.reference_properties,
                    });
                }
                entries.insert(id, body.text.trim().to_string());
            }
            Event::Empty(element) if element.local_name().as_ref() == b"footnote" => {
                if let Some(id) = cursor
                    .attribute(&element, b"id")?
                    .and_then(|value| value.parse::<u32>().ok())
                {
                    entries.insert(id, String::new());
                }
            }
            Event::Start(_) => {
                cursor.capture(start)?;
            }
            Event::End(_) => {
                return Ok(FootnotePart {
                    entries,
                    source,
                    close_at: start,
                    template: template.unwrap_or_default(),
                });
            }
            Event::Eof => return Err(cursor.truncated()),
            _ => {}
        }
    }
}

/// Consumes one footnote element after its start tag.
fn parse_footnote(cursor: &mut XmlCursor<'_>) -> Result<FootnoteBody, DocxError> {
    let mut body = FootnoteBody::default();
    let mut depth = 1usize;
    let mut run_properties: Option<&str> = None;
    loop {
        let (event, start, end) = cursor.next()?;
        match event {
            Event::Start(element) => match element.local_name().as_ref() {
                b"pPr" if body.paragraph_properties.is_none() => {
                    body.paragraph_properties = Some(cursor.capture(start)?.markup.to_string());
                }
                b"rPr" => run_properties = Some(cursor.capture(start)?.markup),
                b"t" => body.text.push_str(&cursor.text_content()?),
                b"r" => {
                    run_properties = None;
                    depth += 1;
                }
                _ => depth += 1,
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                b"rPr" => run_properties = Some(cursor.slice(start, end)?),
                b"footnoteRef" if body.reference_properties.is_none() => {
                    body.reference_properties = run_properties.map(str::to_string);
                }
                _ => {}
            },
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(body);
                }
            }
            Event::Eof => return Err(cursor.truncated()),
            _ => {}
        }
    }
}

// ============================================================================
// SECTION: Writing
// ============================================================================

/// Returns the part with the appended footnotes inserted before the root end tag.
pub(crate) fn write_footnotes(
    part: &FootnotePart<'_>,
    appended: &[Footnote],
    reference_properties: Option<&Markup>,
) -> String {
    let head = part.source.get(.. part.close_at).unwrap_or(part.source);
    let tail = part.source.get(part.close_at ..).unwrap_or_default();
    let paragraph_properties =
        part.template.paragraph_properties.as_deref().unwrap_or(DEFAULT_PARAGRAPH_PROPERTIES);
    let mark_properties = part
        .template
        .reference_properties
        .as_deref()
        .or_else(|| reference_properties.map(Markup::as_str))
        .unwrap_or(DEFAULT_REFERENCE_PROPERTIES);

    let mut out = String::with_capacity(part.source.len() + appended.len() * 256);
    out.push_str(head);
    for footnote in appended {
        out.push_str(&format!("<w:footnote w:id=\"{}\"><w:p>", footnote.id));
        out.push_str(paragraph_properties);
        out.push_str("<w:r>");
        out.push_str(mark_properties);
        out.push_str("<w:footnoteRef/></w:r><w:r><w:t xml:space=\"preserve\"> ");
        out.push_str(&escape_text(&footnote.text));
        out.push_str("</w:t></w:r></w:p></w:footnote>");
    }
    out.push_str(tail);
    out
}
