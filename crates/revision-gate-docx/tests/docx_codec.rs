// crates/revision-gate-docx/tests/docx_codec.rs
// ============================================================================
// Module: DOCX Codec Tests
// Description: Decode, encode, and full-run tests over synthesized packages.
// ============================================================================
//! ## Overview
//! Builds `.docx` packages in memory, decodes them into the document tree,
//! runs the revision engine, and checks the written package: tracked-change
//! markup, appended footnotes, byte-identical untouched content, and limits.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use revision_gate_core::ClaimClass;
use revision_gate_core::CodecError;
use revision_gate_core::Document;
use revision_gate_core::DocumentCodec;
use revision_gate_core::GateConfig;
use revision_gate_core::ParagraphItem;
use revision_gate_core::PatchSpecLoader;
use revision_gate_core::PatchStatus;
use revision_gate_core::QuestionGate;
use revision_gate_core::QuestionId;
use revision_gate_core::RevisionEngine;
use revision_gate_core::RevisionOutcome;
use revision_gate_core::RunContext;
use revision_gate_core::RunContent;
use revision_gate_core::RunId;
use revision_gate_core::SourceId;
use revision_gate_core::SourceKind;
use revision_gate_core::SourceRecord;
use revision_gate_core::SourceRegistry;
use revision_gate_core::Timestamp;
use revision_gate_docx::DOCUMENT_PART;
use revision_gate_docx::DocxCodec;
use revision_gate_docx::DocxCodecConfig;
use revision_gate_docx::DocxError;
use revision_gate_docx::FOOTNOTES_PART;
use serde_json::Value;
use serde_json::json;

use crate::common::CONTENT_TYPES;
use crate::common::DOCUMENT_XML;
use crate::common::FOOTNOTES_XML;
use crate::common::MEDIA;
use crate::common::entry_names;
use crate::common::package;
use crate::common::read_entry;
use crate::common::read_text;
use crate::common::standard_package;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn registry() -> SourceRegistry {
    SourceRegistry::from_records([SourceRecord {
        id: SourceId::new("src-1"),
        kind: SourceKind::Required,
        fulltext_available: true,
        locator: "library/src-1.pdf".to_string(),
    }])
    .unwrap()
}

fn gate_config() -> GateConfig {
    let mut config = GateConfig::default();
    config.questions.insert(
        QuestionId::new("q1"),
        QuestionGate {
            required_sources: vec![SourceId::new("src-1")],
            optional_sources: Vec::new(),
            claim: ClaimClass::Core,
        },
    );
    config
}

fn market_patch() -> Value {
    json!({
        "patches": [{
            "patch_id": "p-market",
            "question_id": "q1",
            "anchor": "12% in 2022",
            "replacement": "15% in 2023",
            "reason": "Updated figure",
            "source_refs": ["src-1"],
            "footnote_refs": ["fn:oecd", "fnid:1"],
        }],
        "footnote_sources": { "oecd": "OECD Outlook 2024." },
    })
}

fn run(document: Document, payload: Value) -> RevisionOutcome {
    let registry = registry();
    let batch = PatchSpecLoader::new(&registry).load_value(payload).unwrap();
    let context = RunContext::new(
        RunId::new("20260212T120000Z_ABC123"),
        "Reviewer",
        Timestamp::UnixMillis(1_770_897_600_000),
    );
    RevisionEngine::default().run(&context, document, &batch, &gate_config(), &registry).unwrap()
}

fn texts(document: &Document) -> Vec<String> {
    document.paragraphs().map(|paragraph| paragraph.visible_text()).collect()
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

#[test]
fn decode_builds_paragraphs_from_direct_body_children() {
    let document = DocxCodec::default().read(&standard_package()).unwrap();

    assert_eq!(
        texts(&document),
        vec![
            "Q1. Market size".to_string(),
            "Growth was 12% in 2022.".to_string(),
            "link & text earlier insert".to_string(),
            "See page 4\tdone".to_string(),
        ]
    );
    assert!(document.blocks.iter().any(|block| matches!(
        block,
        revision_gate_core::Block::Markup(markup) if markup.as_str().contains("<w:tbl>")
    )));
}

#[test]
fn decode_keeps_run_formatting_and_footnote_references() {
    let document = DocxCodec::default().read(&standard_package()).unwrap();
    let paragraph = document.paragraph(1).unwrap();

    let ParagraphItem::Run(bold) = &paragraph.items[1] else {
        panic!("expected a run, got {:?}", paragraph.items[1]);
    };
    assert_eq!(bold.properties.as_ref().unwrap().as_str(), "<w:rPr><w:b/></w:rPr>");
    assert_eq!(bold.visible_text(), "12% in 2022");

    let ParagraphItem::Run(reference) = &paragraph.items[2] else {
        panic!("expected a footnote run");
    };
    assert!(matches!(
        reference.content.as_slice(),
        [RunContent::FootnoteReference {
            id: 1,
            ..
        }]
    ));
}

#[test]
fn decode_reads_revisions_fields_and_opaque_constructs() {
    let document = DocxCodec::default().read(&standard_package()).unwrap();

    let opaque = &document.paragraph(2).unwrap().items;
    assert!(matches!(&opaque[0], ParagraphItem::Opaque(item) if item.text.is_empty()));
    assert!(matches!(&opaque[1], ParagraphItem::Opaque(item) if item.text == "link & text"));
    let ParagraphItem::Insertion(revision) = &opaque[2] else {
        panic!("expected an insertion");
    };
    assert_eq!(revision.id, 7);
    assert_eq!(revision.author, "Editor");
    assert_eq!(revision.date.as_deref(), Some("2025-01-01T00:00:00Z"));

    let field_chars = document
        .paragraph(3)
        .unwrap()
        .items
        .iter()
        .filter_map(|item| match item {
            ParagraphItem::Run(run) => Some(run),
            _ => None,
        })
        .flat_map(|run| run.content.iter())
        .filter(|content| matches!(content, RunContent::FieldChar { .. }))
        .count();
    assert_eq!(field_chars, 3);
}

#[test]
fn decode_reads_footnotes_revision_ids_and_baseline() {
    let document = DocxCodec::default().read(&standard_package()).unwrap();

    assert_eq!(document.footnotes.text(1), Some("Existing source."));
    assert_eq!(document.footnotes.text(2), Some("Second note."));
    assert!(!document.footnotes.contains(u32::MAX));
    assert_eq!(document.footnotes.max_id(), Some(2));
    // The formatting revision inside the footnote part holds the highest id.
    assert_eq!(document.next_revision_id, 42);
    assert_eq!(document.baseline_changes.insertions, 1);
    assert_eq!(document.baseline_changes.deletions, 0);
    assert_eq!(
        document.footnote_reference_properties.as_ref().unwrap().as_str(),
        "<w:rPr><w:rStyle w:val=\"FootnoteReference\"/></w:rPr>"
    );
}

#[test]
fn decode_without_footnote_part_uses_defaults() {
    let bytes = package(&[("word/document.xml", DOCUMENT_XML.as_bytes())]);
    let document = DocxCodec::default().read(&bytes).unwrap();

    assert_eq!(document.footnotes.max_id(), None);
    assert_eq!(document.next_revision_id, 8);
}

#[test]
fn missing_document_part_is_a_parse_error() {
    let bytes = package(&[("[Content_Types].xml", CONTENT_TYPES.as_bytes())]);
    let err = DocxCodec::default().decode(&bytes).unwrap_err();

    assert!(matches!(err, CodecError::Parse(message) if message.contains(DOCUMENT_PART)));
}

#[test]
fn non_zip_input_is_a_package_error() {
    let err = DocxCodec::default().read(b"plain text, not a package").unwrap_err();

    assert!(matches!(err, DocxError::Package(_)));
}

#[test]
fn malformed_xml_is_rejected() {
    let broken = "<w:document xmlns:w=\"w\"><w:body><w:p><w:r><w:t>open</w:r></w:p></w:body>";
    let bytes = package(&[("word/document.xml", broken.as_bytes())]);
    let err = DocxCodec::default().read(&bytes).unwrap_err();

    assert!(matches!(err, DocxError::Xml { .. } | DocxError::Structure { .. }), "{err:?}");
}

#[test]
fn document_bound_to_another_prefix_is_rejected() {
    let document = DOCUMENT_XML.replace("w:", "x:").replace("xmlns:w=", "xmlns:x=");
    let bytes = package(&[("word/document.xml", document.as_bytes())]);
    let err = DocxCodec::default().read(&bytes).unwrap_err();

    assert!(
        matches!(err, DocxError::UnsupportedPrefix { ref part, ref prefix }
            if part == DOCUMENT_PART && prefix == "x"),
        "{err:?}"
    );
}

#[test]
fn default_namespace_document_is_rejected() {
    let document = DOCUMENT_XML.replace("w:", "").replace("xmlns:w=", "xmlns=");
    let bytes = package(&[("word/document.xml", document.as_bytes())]);
    let err = DocxCodec::default().read(&bytes).unwrap_err();

    assert!(
        matches!(err, DocxError::UnsupportedPrefix { ref prefix, .. } if prefix.is_empty()),
        "{err:?}"
    );
}

#[test]
fn footnote_part_bound_to_another_prefix_is_rejected() {
    let footnotes = FOOTNOTES_XML.replace("w:", "f:").replace("xmlns:w=", "xmlns:f=");
    let bytes = package(&[
        ("word/document.xml", DOCUMENT_XML.as_bytes()),
        ("word/footnotes.xml", footnotes.as_bytes()),
    ]);
    let err = DocxCodec::default().read(&bytes).unwrap_err();

    assert!(
        matches!(err, DocxError::UnsupportedPrefix { ref part, ref prefix }
            if part == FOOTNOTES_PART && prefix == "f"),
        "{err:?}"
    );
}

#[test]
fn oversized_part_is_rejected() {
    let codec = DocxCodec::new(DocxCodecConfig {
        max_part_bytes: 64,
        ..DocxCodecConfig::default()
    });
    let err = codec.read(&standard_package()).unwrap_err();

    assert!(matches!(
        err,
        DocxError::PartTooLarge {
            max_bytes: 64,
            ..
        }
    ));
}

#[test]
fn package_with_too_many_entries_is_rejected() {
    let codec = DocxCodec::new(DocxCodecConfig {
        max_entries: 2,
        ..DocxCodecConfig::default()
    });
    let err = codec.read(&standard_package()).unwrap_err();

    assert!(matches!(err, DocxError::Package(message) if message.contains("entries")));
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

#[test]
fn unchanged_document_round_trips_byte_for_byte() {
    let original = standard_package();
    let codec = DocxCodec::default();
    let document = codec.read(&original).unwrap();
    let written = codec.write(&original, &document).unwrap();

    assert_eq!(read_text(&written, DOCUMENT_PART), DOCUMENT_XML);
    assert_eq!(read_text(&written, FOOTNOTES_PART), FOOTNOTES_XML);
    assert_eq!(read_entry(&written, "word/media/image1.png").unwrap(), MEDIA);
    assert_eq!(entry_names(&written), entry_names(&original));
}

#[test]
fn applied_patch_writes_tracked_changes_and_footnote() {
    let original = standard_package();
    let codec = DocxCodec::default();
    let outcome = run(codec.decode(&original).unwrap(), market_patch());
    assert_eq!(outcome.audit.entry(0).unwrap().status, PatchStatus::Applied);

    let written = codec.encode(&original, &outcome.document).unwrap();
    let document_xml = read_text(&written, DOCUMENT_PART);
    assert!(document_xml.contains(
        "<w:del w:id=\"42\" w:author=\"Reviewer\" w:date=\"2026-02-12T12:00:00Z\">"
    ));
    assert!(document_xml.contains("<w:delText>12% in 2022</w:delText>"));
    assert!(document_xml.contains("<w:ins w:id=\"43\" w:author=\"Reviewer\""));
    assert!(document_xml.contains("<w:rPr><w:b/></w:rPr><w:t>15% in 2023</w:t>"));
    assert!(document_xml.contains("<w:footnoteReference w:id=\"3\"/>"));
    // Untouched blocks are carried over verbatim.
    assert!(document_xml.contains("<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Table 12% in 2022</w:t>"));
    assert!(document_xml.contains(
        "<w:p w:rsidR=\"00A1B2C3\"><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr>"
    ));

    let footnotes_xml = read_text(&written, FOOTNOTES_PART);
    assert!(footnotes_xml.contains("<w:footnote w:id=\"3\">"));
    assert!(footnotes_xml.contains("OECD Outlook 2024."));
    assert!(footnotes_xml.ends_with("</w:footnotes>"));
    assert_eq!(read_entry(&written, "word/media/image1.png").unwrap(), MEDIA);
}

#[test]
fn written_package_decodes_to_the_revised_text() {
    let original = standard_package();
    let codec = DocxCodec::default();
    let outcome = run(codec.decode(&original).unwrap(), market_patch());
    let written = codec.encode(&original, &outcome.document).unwrap();
    let reread = codec.decode(&written).unwrap();

    assert_eq!(reread.paragraph(1).unwrap().visible_text(), "Growth was 15% in 2023.");
    assert_eq!(reread.footnotes.text(3), Some("OECD Outlook 2024."));
    assert_eq!(reread.next_revision_id, 44);
    assert_eq!(reread.baseline_changes.insertions, 2);
    assert_eq!(reread.baseline_changes.deletions, 1);
}

#[test]
fn rerunning_on_written_output_is_idempotent() {
    let original = standard_package();
    let codec = DocxCodec::default();
    let first = run(codec.decode(&original).unwrap(), market_patch());
    let written = codec.encode(&original, &first.document).unwrap();

    let second = run(codec.decode(&written).unwrap(), market_patch());
    assert_eq!(second.audit.entry(0).unwrap().status, PatchStatus::AlreadyApplied);
    assert!(second.changes.is_empty());
    assert!(second.document.footnotes.appended().is_empty());
}

#[test]
fn new_footnote_without_footnote_part_fails_the_write() {
    let original = package(&[("word/document.xml", DOCUMENT_XML.as_bytes())]);
    let codec = DocxCodec::default();
    let mut payload = market_patch();
    payload["patches"][0]["footnote_refs"] = json!(["fn:oecd"]);
    let outcome = run(codec.decode(&original).unwrap(), payload);

    let err = codec.encode(&original, &outcome.document).unwrap_err();
    assert!(matches!(err, CodecError::Write(message) if message.contains(FOOTNOTES_PART)));
}

#[test]
fn tree_that_no_longer_matches_the_original_is_rejected() {
    let original = standard_package();
    let codec = DocxCodec::default();
    let mut document = codec.read(&original).unwrap();
    document.blocks.pop();

    assert!(matches!(codec.write(&original, &document), Err(DocxError::Structure { .. })));
}

#[test]
fn revised_package_survives_a_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.docx");
    std::fs::write(&input, standard_package()).unwrap();

    let codec = DocxCodec::default();
    let original = std::fs::read(&input).unwrap();
    let outcome = run(codec.decode(&original).unwrap(), market_patch());
    let output = dir.path().join("report_revised.docx");
    std::fs::write(&output, codec.encode(&original, &outcome.document).unwrap()).unwrap();

    let reread = codec.decode(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(reread.paragraph(1).unwrap().visible_text(), "Growth was 15% in 2023.");
}
