// crates/revision-gate-docx/src/xml.rs
// ============================================================================
// Module: DOCX XML Cursor
// Description: Event reader over one package part that tracks byte spans.
// Purpose: Let parsers keep untouched elements as exact source slices.
// Dependencies: quick-xml
// ============================================================================

//! ## Overview
//! Events are contiguous in the source, so the reader position before and
//! after each event brackets its bytes exactly. Parsers use those spans to
//! lift whole elements out of the part verbatim instead of re-serializing
//! markup they do not interpret.
//!
//! Part roots must bind WordprocessingML to the `w` prefix; the writer emits
//! new markup with that prefix and spliced elements have to resolve against
//! the same declaration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::name::PrefixDeclaration;

use crate::error::DocxError;

/// WordprocessingML main namespace.
const WORD_NAMESPACE: &[u8] =
    b"http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Only prefix the codec reads and writes WordprocessingML under.
const WORD_PREFIX: &[u8] = b"w";

// ============================================================================
// SECTION: Cursor
// ============================================================================

/// Element lifted out of a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Captured<'a> {
    /// Exact source of the element, tags included.
    pub markup: &'a str,
    /// Concatenated content of descendant `t` elements.
    pub text: String,
}

/// Span-tracking event reader over one part.
pub(crate) struct XmlCursor<'a> {
    /// Part name used in errors.
    part: &'a str,
    /// Part source.
    source: &'a str,
    /// Underlying reader.
    reader: Reader<&'a [u8]>,
}

impl<'a> XmlCursor<'a> {
    /// Creates a cursor at the start of a part.
    pub(crate) fn new(part: &'a str, source: &'a str) -> Self {
        Self {
            part,
            source,
            reader: Reader::from_str(source),
        }
    }

    /// Part name.
    pub(crate) const fn part(&self) -> &'a str {
        self.part
    }

    /// Reads the next event with its start and end byte offsets.
    pub(crate) fn next(&mut self) -> Result<(Event<'a>, usize, usize), DocxError> {
        let start = self.position()?;
        let event = self.reader.read_event().map_err(|err| self.xml_error(err))?;
        let end = self.position()?;
        Ok((event, start, end))
    }

    /// Source slice between two offsets.
    pub(crate) fn slice(&self, start: usize, end: usize) -> Result<&'a str, DocxError> {
        self.source
            .get(start .. end)
            .ok_or_else(|| DocxError::structure(self.part, "element span is not addressable"))
    }

    /// Consumes the rest of an element whose start tag began at `start`.
    pub(crate) fn capture(&mut self, start: usize) -> Result<Captured<'a>, DocxError> {
        let mut depth = 1usize;
        let mut text = String::new();
        let mut text_depth: Option<usize> = None;
        loop {
            let (event, _, end) = self.next()?;
            match event {
                Event::Start(element) => {
                    depth += 1;
                    if text_depth.is_none() && element.local_name().as_ref() == b"t" {
                        text_depth = Some(depth);
                    }
                }
                Event::End(_) => {
                    if text_depth == Some(depth) {
                        text_depth = None;
                    }
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Captured {
                            markup: self.slice(start, end)?,
                            text,
                        });
                    }
                }
                Event::Text(value) if text_depth.is_some() => {
                    text.push_str(&self.unescape(&value)?);
                }
                Event::CData(value) if text_depth.is_some() => {
                    text.push_str(&String::from_utf8_lossy(&value));
                }
                Event::Eof => return Err(self.truncated()),
                _ => {}
            }
        }
    }

    /// Consumes the rest of a text element and returns its content.
    pub(crate) fn text_content(&mut self) -> Result<String, DocxError> {
        let mut depth = 1usize;
        let mut text = String::new();
        loop {
            let (event, ..) = self.next()?;
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                }
                Event::Text(value) if depth == 1 => text.push_str(&self.unescape(&value)?),
                Event::CData(value) if depth == 1 => {
                    text.push_str(&String::from_utf8_lossy(&value));
                }
                Event::Eof => return Err(self.truncated()),
                _ => {}
            }
        }
    }

    /// Unescaped value of the attribute with the given local name.
    pub(crate) fn attribute(
        &self,
        element: &BytesStart<'_>,
        local_name: &[u8],
    ) -> Result<Option<String>, DocxError> {
        for attribute in element.attributes() {
            let attribute = attribute.map_err(|err| self.xml_error(err))?;
            if attribute.key.local_name().as_ref() == local_name {
                let value = attribute.unescape_value().map_err(|err| self.xml_error(err))?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }

    /// Rejects a root element that is not under the `w` prefix or that binds
    /// WordprocessingML to any other prefix.
    pub(crate) fn require_word_prefix(&self, root: &BytesStart<'_>) -> Result<(), DocxError> {
        let name = root.name();
        let root_prefix = name.prefix().map_or(&b""[..], |prefix| prefix.into_inner());
        if root_prefix != WORD_PREFIX {
            return Err(self.unsupported_prefix(root_prefix));
        }
        for attribute in root.attributes() {
            let attribute = attribute.map_err(|err| self.xml_error(err))?;
            let declared = match attribute.key.as_namespace_binding() {
                Some(PrefixDeclaration::Named(prefix)) => prefix,
                Some(PrefixDeclaration::Default) => b"",
                None => continue,
            };
            if declared != WORD_PREFIX && attribute.value.as_ref() == WORD_NAMESPACE {
                return Err(self.unsupported_prefix(declared));
            }
        }
        Ok(())
    }

    /// Error for a part that ends inside an element.
    pub(crate) fn truncated(&self) -> DocxError {
        DocxError::structure(self.part, "part ends inside an open element")
    }

    /// Current byte offset.
    fn position(&self) -> Result<usize, DocxError> {
        usize::try_from(self.reader.buffer_position())
            .map_err(|_| DocxError::structure(self.part, "offset exceeds address space"))
    }

    /// Unescapes character data.
    fn unescape(&self, value: &BytesText<'_>) -> Result<String, DocxError> {
        value.unescape().map(std::borrow::Cow::into_owned).map_err(|err| self.xml_error(err))
    }

    /// Error naming a prefix the codec does not handle.
    fn unsupported_prefix(&self, prefix: &[u8]) -> DocxError {
        DocxError::UnsupportedPrefix {
            part: self.part.to_string(),
            prefix: String::from_utf8_lossy(prefix).into_owned(),
        }
    }

    /// Wraps a parser error.
    fn xml_error(&self, err: impl std::fmt::Display) -> DocxError {
        DocxError::Xml {
            part: self.part.to_string(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Raw attribute text of a start tag, with its leading whitespace.
pub(crate) fn raw_attributes(tag: &str, element: &BytesStart<'_>) -> String {
    let name_len = element.name().as_ref().len();
    let inner = tag.strip_prefix('<').unwrap_or(tag);
    let inner = inner.strip_suffix("/>").or_else(|| inner.strip_suffix('>')).unwrap_or(inner);
    inner.get(name_len ..).unwrap_or_default().to_string()
}

/// Escapes text content.
pub(crate) fn escape_text(text: &str) -> String {
    quick_xml::escape::partial_escape(text).into_owned()
}

/// Escapes an attribute value.
pub(crate) fn escape_attribute(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}
