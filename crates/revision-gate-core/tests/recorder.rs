// crates/revision-gate-core/tests/recorder.rs
// ============================================================================
// Module: Audit Recorder Tests
// Description: Tests for audit bookkeeping and tabular projections.
// ============================================================================
//! ## Overview
//! Validates one-entry-per-record bookkeeping and the change audit and
//! question-to-source views derived from it.

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

use revision_gate_core::AuditEntry;
use revision_gate_core::AuditError;
use revision_gate_core::AuditRecorder;
use revision_gate_core::CHANGE_AUDIT_HEADERS;
use revision_gate_core::GateOutcome;
use revision_gate_core::PatchId;
use revision_gate_core::PatchStatus;
use revision_gate_core::QuestionId;
use revision_gate_core::SourceId;

fn entry(position: usize, question: &str, status: PatchStatus) -> AuditEntry {
    AuditEntry {
        patch_id: PatchId::positional(position),
        position,
        question_id: Some(QuestionId::new(question)),
        gate_outcome: Some(if status == PatchStatus::GateFailed {
            GateOutcome::Fail
        } else {
            GateOutcome::Pass
        }),
        status,
        applied: status.is_applied(),
        reason: "Updated, with \"quotes\"".to_string(),
        detail: String::new(),
        source_refs: vec![SourceId::new("src-2")],
        consulted_sources: vec![SourceId::new("src-1")],
        before_text: "12%".to_string(),
        after_text: "15%".to_string(),
        change_ids: if status.is_applied() { vec![100, 101] } else { Vec::new() },
        paragraph_index: Some(0),
    }
}

#[test]
fn duplicate_positions_are_rejected() {
    let mut recorder = AuditRecorder::new();
    recorder.record(entry(0, "q1", PatchStatus::Applied)).unwrap();
    let err = recorder.record(entry(0, "q1", PatchStatus::Applied)).unwrap_err();
    assert!(matches!(
        err,
        AuditError::Duplicate {
            position: 0
        }
    ));
    assert_eq!(recorder.len(), 1);
}

#[test]
fn change_audit_follows_record_order() {
    let mut recorder = AuditRecorder::new();
    recorder.record(entry(2, "q2", PatchStatus::GateFailed)).unwrap();
    recorder.record(entry(0, "q1", PatchStatus::Applied)).unwrap();
    recorder.record(entry(1, "q1", PatchStatus::AnchorNotFound)).unwrap();

    let rows = recorder.change_audit();
    let positions: Vec<usize> = rows.iter().map(|row| row.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    assert_eq!(rows[0].change_ids, "100;101");
    assert_eq!(rows[0].status, "applied");
    assert_eq!(rows[2].gate_outcome, "fail");
}

#[test]
fn question_map_groups_and_counts() {
    let mut recorder = AuditRecorder::new();
    recorder.record(entry(0, "q1", PatchStatus::Applied)).unwrap();
    recorder.record(entry(1, "q1", PatchStatus::AnchorAmbiguous)).unwrap();
    recorder.record(entry(2, "q2", PatchStatus::GateFailed)).unwrap();
    let mut malformed = entry(3, "q3", PatchStatus::Malformed);
    malformed.question_id = None;
    malformed.gate_outcome = None;
    recorder.record(malformed).unwrap();

    let rows = recorder.question_source_map();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].question_id, "q1");
    assert_eq!(rows[0].outcome, "pass");
    assert_eq!(rows[0].consulted_sources, "src-1;src-2");
    assert!(rows[0].has_sources);
    assert_eq!((rows[0].patches_total, rows[0].patches_applied), (2, 1));
    assert_eq!(rows[1].outcome, "fail");
}

#[test]
fn question_without_gate_outcome_is_not_evaluated() {
    let mut recorder = AuditRecorder::new();
    let mut malformed = entry(0, "q1", PatchStatus::Malformed);
    malformed.gate_outcome = None;
    malformed.consulted_sources.clear();
    malformed.source_refs.clear();
    recorder.record(malformed).unwrap();

    let rows = recorder.question_source_map();
    assert_eq!(rows[0].outcome, "not_evaluated");
    assert!(!rows[0].has_sources);
    assert_eq!(rows[0].consulted_sources, "");
}

#[test]
fn csv_output_has_headers_and_quotes_fields() {
    let mut recorder = AuditRecorder::new();
    recorder.record(entry(0, "q1", PatchStatus::Applied)).unwrap();
    let csv = String::from_utf8(recorder.change_audit_csv().unwrap()).unwrap();
    let mut lines = csv.lines();

    assert_eq!(lines.next().unwrap(), CHANGE_AUDIT_HEADERS.join(","));
    let row = lines.next().unwrap();
    assert!(row.starts_with("patch-001,0,q1,pass,applied,true,12%,15%,"));
    assert!(row.contains("\"Updated, with \"\"quotes\"\"\""));
    assert!(lines.next().is_none());
}

#[test]
fn empty_recorder_renders_header_only() {
    let recorder = AuditRecorder::new();
    assert!(recorder.is_empty());
    let csv = String::from_utf8(recorder.question_source_map_csv().unwrap()).unwrap();
    assert_eq!(csv.lines().count(), 1);
}
