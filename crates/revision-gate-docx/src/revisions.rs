// crates/revision-gate-docx/src/revisions.rs
// ============================================================================
// Module: DOCX Revision Scan
// Description: Finds revision ids and tracked-change counts in a part.
// Purpose: Keep new revision ids unique across the document lineage.
// Dependencies: quick-xml
// ============================================================================

//! ## Overview
//! Every element that carries a revision id is considered, not just
//! insertions and deletions, so ids written by this run never collide with
//! formatting or move revisions already in the document.

use quick_xml::events::Event;

use crate::error::DocxError;
use crate::xml::XmlCursor;

/// Elements whose `w:id` belongs to the revision id space.
const REVISION_ELEMENTS: [&[u8]; 11] = [
    b"ins",
    b"del",
    b"moveFrom",
    b"moveTo",
    b"rPrChange",
    b"pPrChange",
    b"sectPrChange",
    b"tblPrChange",
    b"trPrChange",
    b"tcPrChange",
    b"numberingChange",
];

/// Revision facts of one part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RevisionScan {
    /// Largest revision id found.
    pub max_id: Option<u64>,
    /// `w:ins` elements.
    pub insertions: usize,
    /// `w:del` elements.
    pub deletions: usize,
}

/// Scans a whole part.
pub(crate) fn scan(part: &str, source: &str) -> Result<RevisionScan, DocxError> {
    let mut cursor = XmlCursor::new(part, source);
    let mut result = RevisionScan::default();
    loop {
        let (event, ..) = cursor.next()?;
        let element = match event {
            Event::Start(element) | Event::Empty(element) => element,
            Event::Eof => return Ok(result),
            _ => continue,
        };
        let name = element.local_name();
        if !REVISION_ELEMENTS.contains(&name.as_ref()) {
            continue;
        }
        match name.as_ref() {
            b"ins" => result.insertions += 1,
            b"del" => result.deletions += 1,
            _ => {}
        }
        let id = cursor.attribute(&element, b"id")?.and_then(|value| value.parse::<u64>().ok());
        if let Some(id) = id {
            result.max_id = result.max_id.max(Some(id));
        }
    }
}
