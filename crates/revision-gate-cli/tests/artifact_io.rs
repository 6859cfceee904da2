// crates/revision-gate-cli/tests/artifact_io.rs
// ============================================================================
// Module: Artifact IO Tests
// Description: Write-once sink and bounded reader behavior on disk.
// Purpose: Ensure artifacts never overwrite and never escape the run directory.
// ============================================================================

//! ## Overview
//! Exercises [`FileArtifactSink`] and [`FileArtifactReader`] directly against
//! temporary directories, plus the canonical manifest written at the end of a
//! run.

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

use std::fs;

use revision_gate_cli::artifacts::FileArtifactReader;
use revision_gate_cli::artifacts::FileArtifactSink;
use revision_gate_cli::governance::render_tsv;
use revision_gate_cli::pipeline::execute_run;
use revision_gate_core::Artifact;
use revision_gate_core::ArtifactError;
use revision_gate_core::ArtifactKind;
use revision_gate_core::ArtifactReader;
use revision_gate_core::ArtifactSink;
use revision_gate_core::MANIFEST_FILE_NAME;
use tempfile::TempDir;

use crate::common::RUN_ID;
use crate::common::Workspace;

fn artifact(path: &str, bytes: &[u8]) -> Artifact {
    Artifact {
        kind: ArtifactKind::RunSummary,
        path: path.to_string(),
        content_type: "application/json".to_string(),
        bytes: bytes.to_vec(),
        required: true,
    }
}

// ============================================================================
// SECTION: Sink
// ============================================================================

#[test]
fn sink_creates_nested_directories() {
    let dir = TempDir::new().expect("temp dir");
    let mut sink = FileArtifactSink::new(dir.path().join("run")).expect("sink");
    sink.write(&artifact("reports/summary.json", b"{}")).expect("write");
    let written = fs::read(dir.path().join("run/reports/summary.json")).expect("read back");
    assert_eq!(written, b"{}");
}

#[test]
fn sink_refuses_to_overwrite() {
    let dir = TempDir::new().expect("temp dir");
    let mut sink = FileArtifactSink::new(dir.path().to_path_buf()).expect("sink");
    sink.write(&artifact("summary.json", b"first")).expect("first write");

    let err = sink.write(&artifact("summary.json", b"second")).expect_err("second write");
    assert!(matches!(err, ArtifactError::AlreadyExists(ref path) if path == "summary.json"));
    assert_eq!(fs::read(dir.path().join("summary.json")).expect("read"), b"first");
}

#[test]
fn sink_rejects_paths_outside_the_run_directory() {
    let dir = TempDir::new().expect("temp dir");
    let mut sink = FileArtifactSink::new(dir.path().join("run")).expect("sink");
    for path in ["../escape.json", "reports/../../escape.json", "/tmp/escape.json"] {
        assert!(sink.write(&artifact(path, b"{}")).is_err(), "{path}");
    }
    assert!(!dir.path().join("escape.json").exists());
}

#[test]
fn sink_leaves_no_staging_files_behind() {
    let dir = TempDir::new().expect("temp dir");
    let mut sink = FileArtifactSink::new(dir.path().to_path_buf()).expect("sink");
    sink.write(&artifact("a.json", b"1")).expect("write");
    let _ = sink.write(&artifact("a.json", b"2"));
    let names: Vec<String> = fs::read_dir(dir.path())
        .expect("list")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, ["a.json"]);
}

#[test]
fn finalize_writes_canonical_manifest() {
    let workspace = Workspace::new();
    let report = execute_run(&workspace.request(RUN_ID)).expect("run");
    let written = fs::read(report.run_dir.join(MANIFEST_FILE_NAME)).expect("manifest");
    assert_eq!(written, serde_jcs::to_vec(&report.manifest).expect("canonical json"));

    let mut sink = FileArtifactSink::new(report.run_dir.clone()).expect("sink");
    let err = sink.finalize(&report.manifest).expect_err("manifest is write-once");
    assert!(matches!(err, ArtifactError::AlreadyExists(_)));
}

// ============================================================================
// SECTION: Reader
// ============================================================================

#[test]
fn reader_enforces_size_limit() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("big.bin"), vec![0_u8; 64]).expect("write");
    let reader = FileArtifactReader::new(dir.path().to_path_buf()).expect("reader");

    assert_eq!(reader.read_with_limit("big.bin", 64).expect("within limit").len(), 64);
    let err = reader.read_with_limit("big.bin", 10).expect_err("too large");
    assert!(matches!(
        err,
        ArtifactError::TooLarge {
            max_bytes: 10,
            actual_bytes: 11,
            ..
        }
    ));
}

#[test]
fn reader_rejects_traversal_and_missing_files() {
    let dir = TempDir::new().expect("temp dir");
    fs::create_dir(dir.path().join("run")).expect("run dir");
    fs::write(dir.path().join("secret.txt"), b"secret").expect("write");
    let reader = FileArtifactReader::new(dir.path().join("run")).expect("reader");

    assert!(reader.read_with_limit("../secret.txt", 1024).is_err());
    assert!(reader.read_with_limit("missing.json", 1024).is_err());
}

// ============================================================================
// SECTION: Governance Tables
// ============================================================================

#[test]
fn tsv_rendering_is_tab_delimited_with_header() {
    #[derive(serde::Serialize)]
    struct Row {
        name: &'static str,
        size: u64,
    }

    let rows = [
        Row {
            name: "a.docx",
            size: 10,
        },
        Row {
            name: "b.json",
            size: 2,
        },
    ];
    let bytes = render_tsv(&["name", "size"], &rows).expect("render");
    assert_eq!(String::from_utf8(bytes).expect("utf-8"), "name\tsize\na.docx\t10\nb.json\t2\n");
}
