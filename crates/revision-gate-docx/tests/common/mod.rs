// crates/revision-gate-docx/tests/common/mod.rs
// =============================================================================
// Module: DOCX Test Helpers
// Description: In-memory `.docx` packages for codec tests.
// Purpose: Synthesize packages from XML strings instead of binary fixtures.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::expect_used, reason = "Helpers fail loudly on invalid fixtures.")]

use std::io::Cursor;
use std::io::Read;
use std::io::Write;

use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Content types part.
pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

/// Main document part with a heading, a formatted sentence with a footnote,
/// a table, and a paragraph of opaque constructs.
pub const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>
<w:p w:rsidR="00A1B2C3"><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Q1. Market size</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Growth was </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>12% in 2022</w:t></w:r><w:r><w:rPr><w:rStyle w:val="FootnoteReference"/></w:rPr><w:footnoteReference w:id="1"/></w:r><w:r><w:t>.</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Table 12% in 2022</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:bookmarkStart w:id="0" w:name="intro"/><w:hyperlink r:id="rId5"><w:r><w:t>link &amp; text</w:t></w:r></w:hyperlink><w:ins w:id="7" w:author="Editor" w:date="2025-01-01T00:00:00Z"><w:r><w:t xml:space="preserve"> earlier insert</w:t></w:r></w:ins></w:p>
<w:p><w:r><w:t xml:space="preserve">See </w:t></w:r><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText xml:space="preserve"> PAGEREF intro </w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>page 4</w:t></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r><w:r><w:tab/><w:t>done</w:t></w:r></w:p>
<w:sectPr/></w:body></w:document>"#;

/// Footnote part with separators, one styled footnote, and a formatting revision.
pub const FOOTNOTES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:footnotes xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:footnote w:type="separator" w:id="-1"><w:p><w:r><w:separator/></w:r></w:p></w:footnote><w:footnote w:type="continuationSeparator" w:id="0"><w:p><w:r><w:continuationSeparator/></w:r></w:p></w:footnote><w:footnote w:id="1"><w:p><w:pPr><w:pStyle w:val="FootnoteText"/></w:pPr><w:r><w:rPr><w:rStyle w:val="FootnoteReference"/></w:rPr><w:footnoteRef/></w:r><w:r><w:t xml:space="preserve"> Existing source.</w:t></w:r></w:p></w:footnote><w:footnote w:id="2"><w:p><w:r><w:rPr><w:i/><w:rPrChange w:id="41" w:author="Editor"><w:rPr/></w:rPrChange></w:rPr><w:t>Second note.</w:t></w:r></w:p></w:footnote></w:footnotes>"#;

/// Opaque binary entry used to check verbatim copying.
pub const MEDIA: &[u8] = &[0x89, b'P', b'N', b'G', 0, 1, 2, 3, 4, 5];

/// Builds a package from named entries.
pub fn package(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(bytes).expect("write entry");
    }
    writer.finish().expect("finish package").into_inner()
}

/// Standard package with document, footnotes, and a media entry.
pub fn standard_package() -> Vec<u8> {
    package(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("word/document.xml", DOCUMENT_XML.as_bytes()),
        ("word/footnotes.xml", FOOTNOTES_XML.as_bytes()),
        ("word/media/image1.png", MEDIA),
    ])
}

/// Reads one entry from a package.
pub fn read_entry(bytes: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open package");
    let mut entry = archive.by_name(name).ok()?;
    let mut out = Vec::new();
    entry.read_to_end(&mut out).expect("read entry");
    Some(out)
}

/// Reads one entry as text.
pub fn read_text(bytes: &[u8], name: &str) -> String {
    String::from_utf8(read_entry(bytes, name).expect("entry present")).expect("utf-8 entry")
}

/// Entry names in package order.
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).expect("open package");
    archive.file_names().map(ToString::to_string).collect()
}
