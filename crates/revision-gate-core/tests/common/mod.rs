// crates/revision-gate-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Builders for documents, registries, gates, and patch batches.
// Purpose: Keep integration suites focused on behavior rather than setup.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::expect_used, reason = "Helpers fail loudly on invalid fixtures.")]

use std::collections::BTreeMap;

use revision_gate_core::Block;
use revision_gate_core::ClaimClass;
use revision_gate_core::Document;
use revision_gate_core::FootnoteTable;
use revision_gate_core::GateConfig;
use revision_gate_core::Markup;
use revision_gate_core::OpaqueItem;
use revision_gate_core::Paragraph;
use revision_gate_core::ParagraphItem;
use revision_gate_core::PatchBatch;
use revision_gate_core::PatchId;
use revision_gate_core::PatchOperation;
use revision_gate_core::PatchSpec;
use revision_gate_core::PatchSpecLoader;
use revision_gate_core::QuestionGate;
use revision_gate_core::QuestionId;
use revision_gate_core::Run;
use revision_gate_core::RunContent;
use revision_gate_core::RunContext;
use revision_gate_core::RunId;
use revision_gate_core::SourceId;
use revision_gate_core::SourceKind;
use revision_gate_core::SourceRecord;
use revision_gate_core::SourceRegistry;
use revision_gate_core::Timestamp;
use serde_json::Value;

/// Bold run formatting used to check formatting inheritance.
pub const BOLD: &str = "<w:rPr><w:b/></w:rPr>";

/// Plain text run.
pub fn text_run(text: &str) -> ParagraphItem {
    ParagraphItem::Run(Run::text(None, text))
}

/// Text run with formatting.
pub fn styled_run(properties: &str, text: &str) -> ParagraphItem {
    ParagraphItem::Run(Run::text(Some(Markup::new(properties)), text))
}

/// Run holding a single footnote reference.
pub fn footnote_run(id: u32) -> ParagraphItem {
    ParagraphItem::Run(Run {
        attributes: Markup::default(),
        properties: Some(Markup::new("<w:rPr><w:rStyle w:val=\"FootnoteReference\"/></w:rPr>")),
        content: vec![RunContent::FootnoteReference {
            id,
            markup: Markup::new(format!("<w:footnoteReference w:id=\"{id}\"/>")),
        }],
    })
}

/// Zero-width bookmark marker.
pub fn bookmark(name: &str) -> ParagraphItem {
    ParagraphItem::Opaque(OpaqueItem {
        markup: Markup::new(format!("<w:bookmarkStart w:id=\"0\" w:name=\"{name}\"/>")),
        text: String::new(),
    })
}

/// Paragraph from items.
pub fn paragraph(items: Vec<ParagraphItem>) -> Paragraph {
    Paragraph {
        attributes: Markup::default(),
        properties: None,
        items,
    }
}

/// Document from paragraphs with one existing footnote (id 1).
pub fn document(paragraphs: Vec<Paragraph>) -> Document {
    let mut footnotes = BTreeMap::new();
    footnotes.insert(1, "Existing note.".to_string());
    Document {
        blocks: paragraphs.into_iter().map(Block::Paragraph).collect(),
        footnotes: FootnoteTable::from_existing(footnotes),
        next_revision_id: 100,
        footnote_reference_properties: None,
        baseline_changes: Default::default(),
    }
}

/// Document with one paragraph per string.
pub fn plain_document(texts: &[&str]) -> Document {
    document(texts.iter().map(|text| paragraph(vec![text_run(text)])).collect())
}

/// Source record.
pub fn source(id: &str, fulltext_available: bool) -> SourceRecord {
    SourceRecord {
        id: SourceId::new(id),
        kind: SourceKind::Required,
        fulltext_available,
        locator: format!("library/{id}.pdf"),
    }
}

/// Registry from `(id, fulltext)` pairs.
pub fn registry(entries: &[(&str, bool)]) -> SourceRegistry {
    SourceRegistry::from_records(entries.iter().map(|(id, fulltext)| source(id, *fulltext)))
        .expect("registry")
}

/// Question gate declaration.
pub fn question_gate(required: &[&str], optional: &[&str], claim: ClaimClass) -> QuestionGate {
    QuestionGate {
        required_sources: required.iter().map(|id| SourceId::new(*id)).collect(),
        optional_sources: optional.iter().map(|id| SourceId::new(*id)).collect(),
        claim,
    }
}

/// Gate config from `(question, required)` pairs with core claims.
pub fn gate_config(entries: &[(&str, &[&str])]) -> GateConfig {
    let mut questions = BTreeMap::new();
    for (question, required) in entries {
        questions.insert(QuestionId::new(*question), question_gate(required, &[], ClaimClass::Core));
    }
    GateConfig {
        questions,
    }
}

/// Run context with a fixed author and timestamp.
pub fn context() -> RunContext {
    RunContext::new(
        RunId::new("20260212T120000Z_ABC123"),
        "Reviewer",
        Timestamp::UnixMillis(1_770_897_600_000),
    )
}

/// Loads a batch from a JSON value against a registry.
pub fn batch(registry: &SourceRegistry, value: Value) -> PatchBatch {
    PatchSpecLoader::new(registry).load_value(value).expect("batch")
}

/// Replace patch citing `src-1` for question `q1`.
pub fn patch(id: &str, anchor: &str, replacement: &str) -> PatchSpec {
    PatchSpec {
        patch_id: PatchId::new(id),
        position: 0,
        question_id: QuestionId::new("q1"),
        operation: PatchOperation::Replace,
        anchor: anchor.to_string(),
        replacement: replacement.to_string(),
        reason: "evidence update".to_string(),
        source_refs: vec![SourceId::new("src-1")],
        footnote_refs: Vec::new(),
        question_anchor: None,
    }
}
