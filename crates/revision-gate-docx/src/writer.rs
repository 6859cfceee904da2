// crates/revision-gate-docx/src/writer.rs
// ============================================================================
// Module: DOCX Body Writer
// Description: Serializes the core document tree back into the main document part.
// Purpose: Emit edited paragraphs as WordprocessingML and reuse everything else.
// Dependencies: revision-gate-core
// ============================================================================

//! ## Overview
//! The writer walks the original part's blocks alongside the revised tree. A
//! block equal to what was parsed is copied from the source unchanged; only
//! blocks that differ are serialized from the tree.
//!
//! Serialized markup always uses the `w` prefix. The reader refuses parts
//! that bind WordprocessingML to anything else, so the prefix resolves
//! against the root declaration the part already carries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use revision_gate_core::Block;
use revision_gate_core::Document;
use revision_gate_core::Paragraph;
use revision_gate_core::ParagraphItem;
use revision_gate_core::Revision;
use revision_gate_core::Run;
use revision_gate_core::RunContent;

use crate::body::BodyPart;
use crate::error::DocxError;
use crate::xml::escape_attribute;
use crate::xml::escape_text;

// ============================================================================
// SECTION: Body
// ============================================================================

/// Serializes the revised body into the original part's frame.
///
/// Returns the serialized part and the number of blocks rewritten.
pub(crate) fn write_body(
    part: &str,
    body: &BodyPart<'_>,
    document: &Document,
) -> Result<(String, usize), DocxError> {
    if body.blocks.len() != document.blocks.len() {
        return Err(DocxError::structure(
            part,
            format!(
                "revised document has {} blocks, original has {}",
                document.blocks.len(),
                body.blocks.len()
            ),
        ));
    }
    let mut out = String::with_capacity(body.prefix.len() + body.suffix.len() + 4096);
    let mut rewritten = 0usize;
    out.push_str(body.prefix);
    for (parsed, block) in body.blocks.iter().zip(&document.blocks) {
        if &parsed.block == block {
            out.push_str(parsed.raw);
            continue;
        }
        rewritten += 1;
        match block {
            Block::Paragraph(paragraph) => write_paragraph(&mut out, paragraph),
            Block::Markup(markup) => out.push_str(markup.as_str()),
        }
    }
    out.push_str(body.suffix);
    Ok((out, rewritten))
}

// ============================================================================
// SECTION: Elements
// ============================================================================

/// Writes one paragraph.
fn write_paragraph(out: &mut String, paragraph: &Paragraph) {
    out.push_str("<w:p");
    out.push_str(paragraph.attributes.as_str());
    out.push('>');
    if let Some(properties) = &paragraph.properties {
        out.push_str(properties.as_str());
    }
    for item in &paragraph.items {
        match item {
            ParagraphItem::Run(run) => write_run(out, run),
            ParagraphItem::Insertion(revision) => write_revision(out, "w:ins", revision),
            ParagraphItem::Deletion(revision) => write_revision(out, "w:del", revision),
            ParagraphItem::Opaque(opaque) => out.push_str(opaque.markup.as_str()),
        }
    }
    out.push_str("</w:p>");
}

/// Writes a tracked-change wrapper.
fn write_revision(out: &mut String, tag: &str, revision: &Revision) {
    out.push('<');
    out.push_str(tag);
    out.push_str(&format!(
        " w:id=\"{}\" w:author=\"{}\"",
        revision.id,
        escape_attribute(&revision.author)
    ));
    if let Some(date) = &revision.date {
        out.push_str(&format!(" w:date=\"{}\"", escape_attribute(date)));
    }
    out.push('>');
    for run in &revision.runs {
        write_run(out, run);
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Writes a run.
fn write_run(out: &mut String, run: &Run) {
    out.push_str("<w:r");
    out.push_str(run.attributes.as_str());
    out.push('>');
    if let Some(properties) = &run.properties {
        out.push_str(properties.as_str());
    }
    for content in &run.content {
        match content {
            RunContent::Text(text) => write_text(out, "w:t", text),
            RunContent::DeletedText(text) => write_text(out, "w:delText", text),
            RunContent::Tab => out.push_str("<w:tab/>"),
            RunContent::FootnoteReference {
                id,
                markup,
            } => {
                if markup.is_empty() {
                    out.push_str(&format!("<w:footnoteReference w:id=\"{id}\"/>"));
                } else {
                    out.push_str(markup.as_str());
                }
            }
            RunContent::Break(markup)
            | RunContent::FieldChar {
                markup,
                ..
            }
            | RunContent::FieldInstruction(markup)
            | RunContent::LayoutHint(markup)
            | RunContent::Other(markup) => out.push_str(markup.as_str()),
        }
    }
    out.push_str("</w:r>");
}

/// Writes a text element, preserving edge whitespace.
fn write_text(out: &mut String, tag: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    out.push('<');
    out.push_str(tag);
    let needs_preserve = text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.contains("  ");
    if needs_preserve {
        out.push_str(" xml:space=\"preserve\"");
    }
    out.push('>');
    out.push_str(&escape_text(text));
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}
