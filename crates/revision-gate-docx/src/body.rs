// crates/revision-gate-docx/src/body.rs
// ============================================================================
// Module: DOCX Body Parser
// Description: Parses the main document part into blocks, paragraphs, and runs.
// Purpose: Build the core document tree while remembering each block's source.
// Dependencies: revision-gate-core, quick-xml
// ============================================================================

//! ## Overview
//! Only direct `w:p` children of `w:body` are parsed; tables, section
//! properties, and content controls stay as raw markup blocks. Inside a
//! paragraph, runs and tracked insertions/deletions are parsed, and any other
//! construct becomes an opaque item carrying the text it displays.
//!
//! Every parsed block keeps the exact source slice it came from so the writer
//! can emit untouched blocks byte-for-byte.

// ============================================================================
// SECTION: Imports
// ============================================================================

use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use revision_gate_core::Block;
use revision_gate_core::FieldCharKind;
use revision_gate_core::Markup;
use revision_gate_core::OpaqueItem;
use revision_gate_core::Paragraph;
use revision_gate_core::ParagraphItem;
use revision_gate_core::Revision;
use revision_gate_core::Run;
use revision_gate_core::RunContent;

use crate::error::DocxError;
use crate::xml::XmlCursor;
use crate::xml::raw_attributes;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Main document part split around its body.
#[derive(Debug, Clone)]
pub(crate) struct BodyPart<'a> {
    /// Source up to and including the body start tag.
    pub prefix: &'a str,
    /// Body blocks in order.
    pub blocks: Vec<ParsedBlock<'a>>,
    /// Source from the body end tag onwards.
    pub suffix: &'a str,
}

/// Block with the source it was parsed from.
#[derive(Debug, Clone)]
pub(crate) struct ParsedBlock<'a> {
    /// Parsed block.
    pub block: Block,
    /// Exact source.
    pub raw: &'a str,
}

// ============================================================================
// SECTION: Body
// ============================================================================

/// Parses the main document part.
pub(crate) fn parse_body<'a>(part: &'a str, source: &'a str) -> Result<BodyPart<'a>, DocxError> {
    let mut cursor = XmlCursor::new(part, source);
    let mut root_seen = false;
    let body_start = loop {
        let (event, _, end) = cursor.next()?;
        if let Event::Start(element) | Event::Empty(element) = &event {
            if !root_seen {
                cursor.require_word_prefix(element)?;
                root_seen = true;
            }
        }
        match event {
            Event::Start(element) if element.local_name().as_ref() == b"body" => break end,
            Event::Empty(element) if element.local_name().as_ref() == b"body" => {
                return Ok(BodyPart {
                    prefix: cursor.slice(0, end)?,
                    blocks: Vec::new(),
                    suffix: cursor.slice(end, source.len())?,
                });
            }
            Event::Eof => return Err(DocxError::structure(part, "document has no body")),
            _ => {}
        }
    };

    let mut blocks = Vec::new();
    let mut pending: Option<usize> = None;
    loop {
        let (event, start, end) = cursor.next()?;
        match event {
            Event::Start(element) if element.local_name().as_ref() == b"p" => {
                flush_markup(&cursor, &mut blocks, &mut pending, start)?;
                let (paragraph, raw_end) = parse_paragraph(&mut cursor, &element, start, end)?;
                blocks.push(ParsedBlock {
                    block: Block::Paragraph(paragraph),
                    raw: cursor.slice(start, raw_end)?,
                });
            }
            Event::Empty(element) if element.local_name().as_ref() == b"p" => {
                flush_markup(&cursor, &mut blocks, &mut pending, start)?;
                let raw = cursor.slice(start, end)?;
                blocks.push(ParsedBlock {
                    block: Block::Paragraph(Paragraph {
                        attributes: Markup::new(raw_attributes(raw, &element)),
                        properties: None,
                        items: Vec::new(),
                    }),
                    raw,
                });
            }
            Event::Start(_) => {
                pending.get_or_insert(start);
                cursor.capture(start)?;
            }
            Event::End(_) => {
                flush_markup(&cursor, &mut blocks, &mut pending, start)?;
                return Ok(BodyPart {
                    prefix: cursor.slice(0, body_start)?,
                    blocks,
                    suffix: cursor.slice(start, source.len())?,
                });
            }
            Event::Eof => return Err(cursor.truncated()),
            _ => {
                pending.get_or_insert(start);
            }
        }
    }
}

/// Closes a run of unparsed body content as a markup block.
fn flush_markup<'a>(
    cursor: &XmlCursor<'a>,
    blocks: &mut Vec<ParsedBlock<'a>>,
    pending: &mut Option<usize>,
    end: usize,
) -> Result<(), DocxError> {
    if let Some(start) = pending.take() {
        let raw = cursor.slice(start, end)?;
        blocks.push(ParsedBlock {
            block: Block::Markup(Markup::new(raw)),
            raw,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Paragraphs
// ============================================================================

/// Parses a paragraph whose start tag spans `start .. tag_end`.
///
/// Returns the paragraph and the offset just past its end tag.
fn parse_paragraph(
    cursor: &mut XmlCursor<'_>,
    element: &BytesStart<'_>,
    start: usize,
    tag_end: usize,
) -> Result<(Paragraph, usize), DocxError> {
    let mut paragraph = Paragraph {
        attributes: Markup::new(raw_attributes(cursor.slice(start, tag_end)?, element)),
        properties: None,
        items: Vec::new(),
    };
    loop {
        let (event, child_start, child_end) = cursor.next()?;
        match event {
            Event::Start(child) => match child.local_name().as_ref() {
                b"pPr" => {
                    paragraph.properties = Some(Markup::new(cursor.capture(child_start)?.markup));
                }
                b"r" => {
                    let run = parse_run(cursor, &child, child_start, child_end)?;
                    paragraph.items.push(ParagraphItem::Run(run));
                }
                b"ins" | b"del" => {
                    paragraph.items.push(parse_revision(cursor, &child, child_start)?);
                }
                b"moveFrom" => {
                    let captured = cursor.capture(child_start)?;
                    paragraph.items.push(opaque(captured.markup, String::new()));
                }
                _ => {
                    let captured = cursor.capture(child_start)?;
                    paragraph.items.push(opaque(captured.markup, captured.text));
                }
            },
            Event::Empty(child) => {
                let raw = cursor.slice(child_start, child_end)?;
                match child.local_name().as_ref() {
                    b"pPr" => paragraph.properties = Some(Markup::new(raw)),
                    b"r" => paragraph.items.push(ParagraphItem::Run(Run {
                        attributes: Markup::new(raw_attributes(raw, &child)),
                        properties: None,
                        content: Vec::new(),
                    })),
                    _ => paragraph.items.push(opaque(raw, String::new())),
                }
            }
            Event::End(_) => return Ok((paragraph, child_end)),
            Event::Eof => return Err(cursor.truncated()),
            _ => {}
        }
    }
}

/// Parses a `w:ins` or `w:del` wrapper.
///
/// Wrappers holding anything other than runs, or lacking a numeric id, are
/// kept as opaque items.
fn parse_revision(
    cursor: &mut XmlCursor<'_>,
    element: &BytesStart<'_>,
    start: usize,
) -> Result<ParagraphItem, DocxError> {
    let insertion = element.local_name().as_ref() == b"ins";
    let id = cursor.attribute(element, b"id")?.and_then(|value| value.parse::<u64>().ok());
    let author = cursor.attribute(element, b"author")?.unwrap_or_default();
    let date = cursor.attribute(element, b"date")?;
    let mut runs = Vec::new();
    let mut runs_only = true;
    let end = loop {
        let (event, child_start, child_end) = cursor.next()?;
        match event {
            Event::Start(child) if child.local_name().as_ref() == b"r" => {
                runs.push(parse_run(cursor, &child, child_start, child_end)?);
            }
            Event::Start(_) => {
                runs_only = false;
                cursor.capture(child_start)?;
            }
            Event::Empty(_) => runs_only = false,
            Event::End(_) => break child_end,
            Event::Eof => return Err(cursor.truncated()),
            _ => {}
        }
    };

    match id {
        Some(id) if runs_only => {
            let revision = Revision {
                id,
                author,
                date,
                runs,
            };
            Ok(if insertion {
                ParagraphItem::Insertion(revision)
            } else {
                ParagraphItem::Deletion(revision)
            })
        }
        _ => {
            let text = if insertion {
                runs.iter().map(Run::visible_text).collect()
            } else {
                String::new()
            };
            Ok(opaque(cursor.slice(start, end)?, text))
        }
    }
}

/// Creates an opaque item.
fn opaque(markup: &str, text: String) -> ParagraphItem {
    ParagraphItem::Opaque(OpaqueItem {
        markup: Markup::new(markup),
        text,
    })
}

// ============================================================================
// SECTION: Runs
// ============================================================================

/// Parses a run whose start tag spans `start .. tag_end`.
fn parse_run(
    cursor: &mut XmlCursor<'_>,
    element: &BytesStart<'_>,
    start: usize,
    tag_end: usize,
) -> Result<Run, DocxError> {
    let mut run = Run {
        attributes: Markup::new(raw_attributes(cursor.slice(start, tag_end)?, element)),
        properties: None,
        content: Vec::new(),
    };
    loop {
        let (event, child_start, child_end) = cursor.next()?;
        match event {
            Event::Start(child) => {
                let content = match child.local_name().as_ref() {
                    b"rPr" => {
                        run.properties = Some(Markup::new(cursor.capture(child_start)?.markup));
                        continue;
                    }
                    b"t" => RunContent::Text(cursor.text_content()?),
                    b"delText" => RunContent::DeletedText(cursor.text_content()?),
                    b"instrText" | b"delInstrText" => {
                        let markup = Markup::new(cursor.capture(child_start)?.markup);
                        RunContent::FieldInstruction(markup)
                    }
                    _ => {
                        let markup = Markup::new(cursor.capture(child_start)?.markup);
                        classify_marker(cursor, &child, markup)?
                    }
                };
                run.content.push(content);
            }
            Event::Empty(child) => {
                let markup = Markup::new(cursor.slice(child_start, child_end)?);
                let content = match child.local_name().as_ref() {
                    b"rPr" => {
                        run.properties = Some(markup);
                        continue;
                    }
                    b"t" | b"delText" => continue,
                    b"tab" => RunContent::Tab,
                    b"br" | b"cr" => RunContent::Break(markup),
                    b"lastRenderedPageBreak" => RunContent::LayoutHint(markup),
                    b"instrText" | b"delInstrText" => RunContent::FieldInstruction(markup),
                    _ => classify_marker(cursor, &child, markup)?,
                };
                run.content.push(content);
            }
            Event::End(_) => return Ok(run),
            Event::Eof => return Err(cursor.truncated()),
            _ => {}
        }
    }
}

/// Classifies field characters and footnote references; anything else is `Other`.
fn classify_marker(
    cursor: &XmlCursor<'_>,
    element: &BytesStart<'_>,
    markup: Markup,
) -> Result<RunContent, DocxError> {
    match element.local_name().as_ref() {
        b"fldChar" => {
            let kind = match cursor.attribute(element, b"fldCharType")?.as_deref() {
                Some("begin") => FieldCharKind::Begin,
                Some("separate") => FieldCharKind::Separate,
                Some("end") => FieldCharKind::End,
                _ => return Ok(RunContent::Other(markup)),
            };
            Ok(RunContent::FieldChar {
                kind,
                markup,
            })
        }
        b"footnoteReference" => {
            match cursor.attribute(element, b"id")?.and_then(|value| value.parse::<u32>().ok()) {
                Some(id) => Ok(RunContent::FootnoteReference {
                    id,
                    markup,
                }),
                None => Ok(RunContent::Other(markup)),
            }
        }
        _ => Ok(RunContent::Other(markup)),
    }
}
