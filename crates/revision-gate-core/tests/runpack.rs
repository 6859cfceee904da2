// crates/revision-gate-core/tests/runpack.rs
// ============================================================================
// Module: Runpack Tests
// Description: Tests for runpack generation and offline verification.
// ============================================================================
//! ## Overview
//! Builds runpacks into a write-once in-memory store, verifies them, and
//! checks that tampering with any artifact is detected.

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

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use revision_gate_core::Artifact;
use revision_gate_core::ArtifactError;
use revision_gate_core::ArtifactKind;
use revision_gate_core::ArtifactReader;
use revision_gate_core::ArtifactRef;
use revision_gate_core::ArtifactSink;
use revision_gate_core::ContentFingerprint;
use revision_gate_core::DEFAULT_HASH_ALGORITHM;
use revision_gate_core::GateOutcome;
use revision_gate_core::GateReport;
use revision_gate_core::InputRecord;
use revision_gate_core::InputRole;
use revision_gate_core::MANIFEST_FILE_NAME;
use revision_gate_core::RevisionEngine;
use revision_gate_core::RevisionOutcome;
use revision_gate_core::RunpackBuilder;
use revision_gate_core::RunpackManifest;
use revision_gate_core::RunpackVerifier;
use revision_gate_core::VerificationStatus;
use revision_gate_core::artifact_path;
use serde_json::json;

use crate::common::batch;
use crate::common::context;
use crate::common::gate_config;
use crate::common::plain_document;
use crate::common::registry;

// ============================================================================
// SECTION: Store
// ============================================================================

#[derive(Clone, Default)]
struct InMemoryArtifactStore {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryArtifactStore {
    fn insert(&self, path: &str, bytes: Vec<u8>) -> Result<(), ArtifactError> {
        let mut guard = self
            .files
            .lock()
            .map_err(|_| ArtifactError::Sink("artifact store mutex poisoned".to_string()))?;
        if guard.contains_key(path) {
            return Err(ArtifactError::AlreadyExists(path.to_string()));
        }
        guard.insert(path.to_string(), bytes);
        Ok(())
    }

    fn overwrite(&self, path: &str, bytes: Vec<u8>) {
        let mut guard = self.files.lock().expect("artifact store mutex poisoned");
        guard.insert(path.to_string(), bytes);
    }

    fn remove(&self, path: &str) {
        let mut guard = self.files.lock().expect("artifact store mutex poisoned");
        guard.remove(path);
    }
}

impl ArtifactSink for InMemoryArtifactStore {
    fn write(&mut self, artifact: &Artifact) -> Result<ArtifactRef, ArtifactError> {
        self.insert(&artifact.path, artifact.bytes.clone())?;
        Ok(ArtifactRef {
            uri: artifact.path.clone(),
        })
    }

    fn finalize(&mut self, manifest: &RunpackManifest) -> Result<ArtifactRef, ArtifactError> {
        let bytes =
            serde_jcs::to_vec(manifest).map_err(|err| ArtifactError::Sink(err.to_string()))?;
        self.insert(MANIFEST_FILE_NAME, bytes)?;
        Ok(ArtifactRef {
            uri: MANIFEST_FILE_NAME.to_string(),
        })
    }
}

impl ArtifactReader for InMemoryArtifactStore {
    fn read_with_limit(&self, path: &str, max_bytes: usize) -> Result<Vec<u8>, ArtifactError> {
        let bytes = {
            let guard = self
                .files
                .lock()
                .map_err(|_| ArtifactError::Sink("artifact store mutex poisoned".to_string()))?;
            guard.get(path).cloned().ok_or_else(|| ArtifactError::Sink("missing artifact".to_string()))?
        };
        if bytes.len() > max_bytes {
            return Err(ArtifactError::TooLarge {
                path: path.to_string(),
                max_bytes,
                actual_bytes: bytes.len(),
            });
        }
        Ok(bytes)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

const REVISED: &[u8] = b"PK revised document bytes";

fn outcome() -> RevisionOutcome {
    let registry = registry(&[("src-1", true)]);
    let batch = batch(
        &registry,
        json!([{
            "question_id": "q1",
            "anchor": "12% in 2022",
            "replacement": "15% in 2023",
            "reason": "Updated figure",
            "source_refs": ["src-1"],
        }]),
    );
    RevisionEngine::default()
        .run(
            &context(),
            plain_document(&["Growth was 12% in 2022."]),
            &batch,
            &gate_config(&[("q1", &["src-1"])]),
            &registry,
        )
        .unwrap()
}

fn inputs() -> Vec<InputRecord> {
    let fingerprint = ContentFingerprint::of(DEFAULT_HASH_ALGORITHM, b"original document");
    vec![InputRecord::new(InputRole::Document, "report.docx", fingerprint)]
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn runpack_build_and_verify_passes() {
    let outcome = outcome();
    let mut store = InMemoryArtifactStore::default();
    let manifest = RunpackBuilder::default().build(&mut store, &outcome, REVISED, &inputs()).unwrap();

    assert_eq!(manifest.artifacts.len(), 5);
    assert_eq!(manifest.inputs.len(), 1);
    let report = RunpackVerifier::default().verify_manifest(&store, &manifest).unwrap();
    assert_eq!(report.status, VerificationStatus::Pass, "{:?}", report.errors);
    assert_eq!(report.checked_files, 5);
}

#[test]
fn artifact_records_fingerprint_the_stored_bytes() {
    let outcome = outcome();
    let mut store = InMemoryArtifactStore::default();
    let manifest =
        RunpackBuilder::default().build(&mut store, &outcome, REVISED, &inputs()).unwrap();

    for record in &manifest.artifacts {
        let stored = store.read(&record.path).unwrap();
        let fingerprint = ContentFingerprint::of(manifest.hash_algorithm, &stored);
        assert_eq!(record.hash, fingerprint.hash, "{}", record.path);
        assert_eq!(record.size_bytes, fingerprint.size_bytes, "{}", record.path);
    }
    let revised = manifest
        .artifacts
        .iter()
        .find(|record| record.kind == ArtifactKind::RevisedDocument)
        .unwrap();
    assert_eq!(revised.size_bytes, REVISED.len() as u64);
    assert_eq!(manifest.inputs[0].size_bytes, b"original document".len() as u64);
}

#[test]
fn build_with_verification_finalizes_once() {
    let outcome = outcome();
    let mut store = InMemoryArtifactStore::default();
    let reader = store.clone();
    let (manifest, report) = RunpackBuilder::default()
        .build_with_verification(&mut store, &reader, &outcome, REVISED, &inputs())
        .unwrap();

    assert_eq!(report.status, VerificationStatus::Pass);
    assert!(manifest.artifacts.iter().any(|artifact| artifact.kind == ArtifactKind::VerifierReport));
    let final_report = RunpackVerifier::default().verify_manifest(&store, &manifest).unwrap();
    assert_eq!(final_report.status, VerificationStatus::Pass);
    assert!(store.read(MANIFEST_FILE_NAME).is_ok());
}

#[test]
fn tampered_artifact_fails_verification() {
    let outcome = outcome();
    let mut store = InMemoryArtifactStore::default();
    let manifest = RunpackBuilder::default().build(&mut store, &outcome, REVISED, &inputs()).unwrap();

    let path = artifact_path(ArtifactKind::ChangeAudit, &manifest.run_id);
    store.overwrite(&path, b"patch_id\n".to_vec());
    let report = RunpackVerifier::default().verify_manifest(&store, &manifest).unwrap();
    assert_eq!(report.status, VerificationStatus::Fail);
    assert!(report.errors.iter().any(|error| error.contains("hash mismatch")));
}

#[test]
fn missing_artifact_fails_verification() {
    let outcome = outcome();
    let mut store = InMemoryArtifactStore::default();
    let manifest = RunpackBuilder::default().build(&mut store, &outcome, REVISED, &inputs()).unwrap();

    store.remove(&artifact_path(ArtifactKind::RevisedDocument, &manifest.run_id));
    let report = RunpackVerifier::default().verify_manifest(&store, &manifest).unwrap();
    assert_eq!(report.status, VerificationStatus::Fail);
    assert!(report.errors.iter().any(|error| error.starts_with("missing artifact")));
}

#[test]
fn inconsistent_gate_report_fails_verification() {
    let outcome = outcome();
    let mut store = InMemoryArtifactStore::default();
    let mut manifest =
        RunpackBuilder::default().build(&mut store, &outcome, REVISED, &inputs()).unwrap();

    let mut report: GateReport = outcome.gate_report.clone();
    for decision in report.decisions.values_mut() {
        decision.outcome = GateOutcome::Pass;
        decision.required_sources.clear();
    }
    let bytes = serde_jcs::to_vec(&report).unwrap();
    let path = artifact_path(ArtifactKind::GateReport, &manifest.run_id);
    store.overwrite(&path, bytes.clone());
    let digest = revision_gate_core::hashing::hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes);
    for entry in &mut manifest.integrity.file_hashes {
        if entry.path == path {
            entry.hash = digest.clone();
        }
    }
    for artifact in &mut manifest.artifacts {
        if artifact.path == path {
            artifact.hash = digest.clone();
        }
    }
    manifest.integrity.root_hash = revision_gate_core::hashing::hash_canonical_json(
        DEFAULT_HASH_ALGORITHM,
        &manifest.integrity.file_hashes,
    )
    .unwrap();

    let verification = RunpackVerifier::default().verify_manifest(&store, &manifest).unwrap();
    assert_eq!(verification.status, VerificationStatus::Fail);
    assert!(verification.errors.iter().any(|error| error.contains("without required sources")));
}

#[test]
fn second_build_into_same_store_is_rejected() {
    let outcome = outcome();
    let mut store = InMemoryArtifactStore::default();
    RunpackBuilder::default().build(&mut store, &outcome, REVISED, &inputs()).unwrap();
    let err = RunpackBuilder::default().build(&mut store, &outcome, REVISED, &inputs()).unwrap_err();
    assert!(err.to_string().contains("already exists"));
}
