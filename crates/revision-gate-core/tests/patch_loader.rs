// crates/revision-gate-core/tests/patch_loader.rs
// ============================================================================
// Module: Patch Spec Loader Tests
// Description: Tests for patch record validation and batch shapes.
// ============================================================================
//! ## Overview
//! Validates that every violation of every record is reported in one pass,
//! that valid records survive alongside invalid ones, and that both payload
//! shapes load.

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

use revision_gate_core::FootnoteRef;
use revision_gate_core::PatchId;
use revision_gate_core::PatchLoadError;
use revision_gate_core::PatchOperation;
use revision_gate_core::PatchSpecLoader;
use revision_gate_core::SourceId;
use serde_json::json;

use crate::common::batch;
use crate::common::registry;

fn valid_record() -> serde_json::Value {
    json!({
        "question_id": "q1",
        "anchor": "12% in 2022",
        "replacement": "15% in 2023",
        "reason": "Updated figure",
        "source_refs": ["src-1"],
    })
}

// ============================================================================
// SECTION: Valid Batches
// ============================================================================

#[test]
fn empty_array_is_a_valid_batch() {
    let registry = registry(&[("src-1", true)]);
    let batch = batch(&registry, json!([]));
    assert!(batch.patches.is_empty());
    assert!(batch.rejected.is_empty());
    assert_eq!(batch.record_count(), 0);
}

#[test]
fn bare_array_loads_with_positional_ids() {
    let registry = registry(&[("src-1", true)]);
    let batch = batch(&registry, json!([valid_record(), valid_record()]));

    assert_eq!(batch.patches.len(), 2);
    assert_eq!(batch.patches[0].patch_id, PatchId::new("patch-001"));
    assert_eq!(batch.patches[1].patch_id, PatchId::new("patch-002"));
    assert_eq!(batch.patches[1].position, 1);
    assert_eq!(batch.patches[0].operation, PatchOperation::Replace);
    assert_eq!(batch.patches[0].source_refs, vec![SourceId::new("src-1")]);
}

#[test]
fn object_payload_carries_footnote_sources() {
    let registry = registry(&[("src-1", true)]);
    let mut record = valid_record();
    record["patch_id"] = json!("P-7");
    record["footnote_refs"] = json!(["fn:smith2023", "fnid:1", 3, "[[fn:smith2023]]"]);
    let result = PatchSpecLoader::new(&registry).load_value(json!({
        "patches": [record],
        "footnote_sources": {"smith2023": "Smith et al. (2023)."},
    }));
    let batch = result.unwrap();

    assert_eq!(batch.rejected.len(), 1, "duplicate footnote token is a violation");
    let violations = &batch.rejected[0].error.violations;
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field, "footnote_refs[3]");
    assert_eq!(batch.footnote_sources.get("smith2023").unwrap(), "Smith et al. (2023).");
}

#[test]
fn footnote_tokens_parse_into_references() {
    let registry = registry(&[("src-1", true)]);
    let mut record = valid_record();
    record["footnote_refs"] = json!(["fn:smith2023", "fnid:1", 3]);
    let batch = batch(
        &registry,
        json!({"patches": [record], "footnote_sources": {"smith2023": "Smith (2023)."}}),
    );

    assert_eq!(
        batch.patches[0].footnote_refs,
        vec![
            FootnoteRef::New("smith2023".to_string()),
            FootnoteRef::Existing(1),
            FootnoteRef::Existing(3),
        ]
    );
}

#[test]
fn delete_operation_requires_empty_replacement() {
    let registry = registry(&[("src-1", true)]);
    let mut record = valid_record();
    record["operation"] = json!("delete");
    record["replacement"] = json!("");
    let batch = batch(&registry, json!([record]));

    assert_eq!(batch.patches.len(), 1);
    assert_eq!(batch.patches[0].operation, PatchOperation::Delete);
}

// ============================================================================
// SECTION: Violations
// ============================================================================

#[test]
fn every_violation_of_a_record_is_reported() {
    let registry = registry(&[("src-1", true)]);
    let batch = batch(
        &registry,
        json!([{
            "question_id": "",
            "anchor": "",
            "reason": 7,
            "source_refs": [],
            "colour": "blue",
        }]),
    );

    assert!(batch.patches.is_empty());
    let fields: Vec<&str> =
        batch.rejected[0].error.violations.iter().map(|violation| violation.field.as_str()).collect();
    for expected in ["colour", "question_id", "anchor", "replacement", "reason", "source_refs"] {
        assert!(fields.contains(&expected), "missing violation for {expected}: {fields:?}");
    }
}

#[test]
fn invalid_records_do_not_block_valid_ones() {
    let registry = registry(&[("src-1", true)]);
    let mut unresolved = valid_record();
    unresolved["source_refs"] = json!(["src-1", "src-404"]);
    let mut no_reason = valid_record();
    no_reason["reason"] = json!("   ");
    let batch = batch(&registry, json!([unresolved, valid_record(), no_reason]));

    assert_eq!(batch.patches.len(), 1);
    assert_eq!(batch.patches[0].position, 1);
    assert_eq!(batch.rejected.len(), 2);
    assert_eq!(batch.rejected[0].error.position, 0);
    assert_eq!(batch.rejected[0].error.violations[0].field, "source_refs[1]");
    assert!(batch.rejected[0].error.violations[0].message.contains("src-404"));
    assert_eq!(batch.rejected[1].error.violations[0].field, "reason");
}

#[test]
fn replace_requires_non_empty_replacement() {
    let registry = registry(&[("src-1", true)]);
    let mut record = valid_record();
    record["replacement"] = json!("");
    let batch = batch(&registry, json!([record]));
    assert_eq!(batch.rejected[0].error.violations[0].field, "replacement");
}

#[test]
fn missing_replacement_is_reported() {
    let registry = registry(&[("src-1", true)]);
    let mut record = valid_record();
    record.as_object_mut().unwrap().remove("replacement");
    let batch = batch(&registry, json!([record]));
    assert_eq!(batch.rejected[0].error.violations[0].field, "replacement");
}

#[test]
fn duplicate_patch_ids_are_rejected() {
    let registry = registry(&[("src-1", true)]);
    let mut first = valid_record();
    first["patch_id"] = json!("P-1");
    let mut second = valid_record();
    second["label"] = json!("P-1");
    let batch = batch(&registry, json!([first, second]));

    assert_eq!(batch.patches.len(), 1);
    assert_eq!(batch.rejected[0].patch_id, PatchId::new("P-1"));
    assert!(batch.rejected[0].error.violations[0].message.contains("duplicate patch id"));
}

#[test]
fn duplicate_source_refs_are_rejected() {
    let registry = registry(&[("src-1", true)]);
    let mut record = valid_record();
    record["source_refs"] = json!(["src-1", "src-1"]);
    let batch = batch(&registry, json!([record]));
    assert_eq!(batch.rejected[0].error.violations[0].field, "source_refs[1]");
}

#[test]
fn unknown_footnote_key_is_rejected() {
    let registry = registry(&[("src-1", true)]);
    let mut record = valid_record();
    record["footnote_refs"] = json!(["fn:missing"]);
    let batch = batch(&registry, json!([record]));
    assert!(batch.rejected[0].error.violations[0].message.contains("missing"));
}

#[test]
fn rejected_record_keeps_readable_fields_for_audit() {
    let registry = registry(&[("src-1", true)]);
    let mut record = valid_record();
    record["source_refs"] = json!(["src-404"]);
    let batch = batch(&registry, json!([record]));
    let rejected = &batch.rejected[0];

    assert_eq!(rejected.anchor, "12% in 2022");
    assert_eq!(rejected.reason, "Updated figure");
    assert_eq!(rejected.source_refs, vec![SourceId::new("src-404")]);
    assert_eq!(rejected.question_id.as_ref().unwrap().as_str(), "q1");
    assert!(rejected.error.to_string().contains("source_refs[0]"));
}

#[test]
fn reserved_anchor_characters_are_rejected() {
    let registry = registry(&[("src-1", true)]);
    let mut record = valid_record();
    record["anchor"] = json!("figure\u{FFFC}");
    let batch = batch(&registry, json!([record]));
    assert_eq!(batch.rejected[0].error.violations[0].field, "anchor");
}

// ============================================================================
// SECTION: Payload Shape
// ============================================================================

#[test]
fn unusable_payloads_fail_the_whole_load() {
    let registry = registry(&[("src-1", true)]);
    let loader = PatchSpecLoader::new(&registry);

    assert!(matches!(loader.load_json(b"{not json"), Err(PatchLoadError::Parse(_))));
    assert!(matches!(loader.load_value(json!("text")), Err(PatchLoadError::Shape(_))));
    assert!(matches!(loader.load_value(json!({"records": []})), Err(PatchLoadError::Shape(_))));
    assert!(matches!(
        loader.load_value(json!({"patches": [], "footnote_sources": {"bad key": "x"}})),
        Err(PatchLoadError::Shape(_))
    ));
}
