// crates/revision-gate-cli/src/pipeline.rs
// ============================================================================
// Module: Revision Run Pipeline
// Description: Loads run inputs, executes the engine, and writes the runpack.
// Purpose: Own the blocking I/O at the run boundaries around the pure core.
// Dependencies: revision-gate-{core, config, docx}, tracing, thiserror
// ============================================================================

//! ## Overview
//! A run reads every input up front with size limits, fingerprints them,
//! decodes the document, and hands everything to the engine. Nothing is
//! written until the engine returns. The run directory is created fresh;
//! an existing directory for the same run id is run-fatal.
//!
//! Failures here are run-fatal. Per-patch failures never surface as errors;
//! they are recorded in the audit trail by the engine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use revision_gate_config::ConfigError;
use revision_gate_config::LimitsConfig;
use revision_gate_config::RegistryFormat;
use revision_gate_config::parse_gate_config;
use revision_gate_config::parse_source_registry;
use revision_gate_config::read_bounded_file;
use revision_gate_config::read_utf8_file;
use revision_gate_core::ArtifactError;
use revision_gate_core::DocumentCodec;
use revision_gate_core::EngineError;
use revision_gate_core::EvidenceGateEvaluator;
use revision_gate_core::GateConfig;
use revision_gate_core::GateReport;
use revision_gate_core::InputRecord;
use revision_gate_core::InputRole;
use revision_gate_core::PatchSpecLoader;
use revision_gate_core::RevisionEngine;
use revision_gate_core::RunContext;
use revision_gate_core::RunId;
use revision_gate_core::RunSummary;
use revision_gate_core::RunpackBuilder;
use revision_gate_core::RunpackError;
use revision_gate_core::RunpackManifest;
use revision_gate_core::SourceRegistry;
use revision_gate_core::TimeError;
use revision_gate_core::Timestamp;
use revision_gate_core::VerificationReport;
use revision_gate_core::VerificationStatus;
use revision_gate_core::core::hashing::DEFAULT_HASH_ALGORITHM;
use revision_gate_core::core::hashing::ContentFingerprint;
use revision_gate_docx::DocxCodec;
use thiserror::Error;
use tracing::info;

use crate::artifacts::FileArtifactReader;
use crate::artifacts::FileArtifactSink;
use crate::governance::GovernanceError;
use crate::governance::GovernanceLedger;
use crate::governance::GovernancePaths;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Run-fatal pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An input file could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The patch spec could not be read as a batch.
    #[error("patch spec {path}: {message}")]
    PatchSpec {
        /// Patch spec path.
        path: String,
        /// Loader message.
        message: String,
    },
    /// The document could not be parsed or serialized.
    #[error("document {path}: {message}")]
    Document {
        /// Document path.
        path: String,
        /// Codec message.
        message: String,
    },
    /// The input already carries tracked changes and a clean baseline is required.
    #[error(
        "input document already contains {insertions} insertions and {deletions} deletions; \
         accept or reject them before revising"
    )]
    DirtyBaseline {
        /// Existing insertions.
        insertions: usize,
        /// Existing deletions.
        deletions: usize,
    },
    /// The run directory already exists.
    #[error("run directory {0} already exists")]
    RunDirectoryExists(String),
    /// The run directory could not be created.
    #[error("unable to create run directory {path}: {message}")]
    RunDirectory {
        /// Run directory path.
        path: String,
        /// I/O message.
        message: String,
    },
    /// The engine could not execute the run.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// An artifact could not be written.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// The runpack could not be built.
    #[error(transparent)]
    Runpack(#[from] RunpackError),
    /// The written runpack failed verification.
    #[error("runpack verification failed: {0}")]
    Verification(String),
    /// Governance manifests could not be written.
    #[error(transparent)]
    Governance(#[from] GovernanceError),
    /// The run timestamp could not be rendered.
    #[error(transparent)]
    Time(#[from] TimeError),
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Fully resolved inputs of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Document to revise.
    pub input_docx: PathBuf,
    /// Patch spec JSON.
    pub patch_spec: PathBuf,
    /// Source registry snapshot (TOML or JSON).
    pub sources: PathBuf,
    /// Gate configuration JSON.
    pub gate_config: PathBuf,
    /// Run identifier; also the run directory name.
    pub run_id: RunId,
    /// Directory holding run directories.
    pub runs_root: PathBuf,
    /// Author stamped on tracked changes.
    pub author: String,
    /// Run timestamp.
    pub timestamp: Timestamp,
    /// Reject inputs that already carry tracked changes.
    pub require_clean_baseline: bool,
    /// Re-read and verify the runpack before finalizing it.
    pub verify_after_write: bool,
    /// Input size limits.
    pub limits: LimitsConfig,
}

impl RunRequest {
    /// Directory this run writes into.
    #[must_use]
    pub fn run_dir(&self) -> PathBuf {
        self.runs_root.join(self.run_id.as_str())
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run directory.
    pub run_dir: PathBuf,
    /// Finalized runpack manifest.
    pub manifest: RunpackManifest,
    /// Run summary.
    pub summary: RunSummary,
    /// Verification report, when verification ran.
    pub verification: Option<VerificationReport>,
    /// Governance manifest paths.
    pub governance: GovernancePaths,
}

/// Inputs of a gate-only evaluation.
#[derive(Debug, Clone)]
pub struct GateRequest {
    /// Source registry snapshot (TOML or JSON).
    pub sources: PathBuf,
    /// Gate configuration JSON.
    pub gate_config: PathBuf,
    /// Optional patch spec limiting evaluation to the questions it references.
    pub patch_spec: Option<PathBuf>,
    /// Input size limits.
    pub limits: LimitsConfig,
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// Executes one revision run end to end.
///
/// # Errors
///
/// Returns [`PipelineError`] when the run cannot start or its outputs cannot
/// be written.
pub fn execute_run(request: &RunRequest) -> Result<RunReport, PipelineError> {
    let limits = &request.limits;
    let document_bytes =
        read_bounded_file(&request.input_docx, "input document", limits.max_document_bytes)?;
    let patch_bytes =
        read_bounded_file(&request.patch_spec, "patch spec", limits.max_patch_spec_bytes)?;
    let registry_format = RegistryFormat::from_path(&request.sources)?;
    let registry_text =
        read_utf8_file(&request.sources, "source registry", limits.max_registry_bytes)?;
    let gate_text =
        read_utf8_file(&request.gate_config, "gate config", limits.max_gate_config_bytes)?;
    let inputs = vec![
        input_record(InputRole::Document, &request.input_docx, &document_bytes),
        input_record(InputRole::PatchSpec, &request.patch_spec, &patch_bytes),
        input_record(InputRole::SourceRegistry, &request.sources, registry_text.as_bytes()),
        input_record(InputRole::GateConfig, &request.gate_config, gate_text.as_bytes()),
    ];

    let registry = parse_source_registry(&registry_text, registry_format)?;
    let gate_config = parse_gate_config(&gate_text)?;
    let batch = PatchSpecLoader::new(&registry).load_json(&patch_bytes).map_err(|err| {
        PipelineError::PatchSpec {
            path: request.patch_spec.display().to_string(),
            message: err.to_string(),
        }
    })?;

    let codec = DocxCodec::default();
    let document = codec.decode(&document_bytes).map_err(|err| PipelineError::Document {
        path: request.input_docx.display().to_string(),
        message: err.to_string(),
    })?;
    let baseline = document.baseline_changes;
    if request.require_clean_baseline && !baseline.is_clean() {
        return Err(PipelineError::DirtyBaseline {
            insertions: baseline.insertions,
            deletions: baseline.deletions,
        });
    }

    let context =
        RunContext::new(request.run_id.clone(), request.author.clone(), request.timestamp);
    let outcome =
        RevisionEngine::default().run(&context, document, &batch, &gate_config, &registry)?;
    let revised = codec.encode(&document_bytes, &outcome.document).map_err(|err| {
        PipelineError::Document {
            path: request.input_docx.display().to_string(),
            message: err.to_string(),
        }
    })?;

    let run_dir = request.run_dir();
    create_run_dir(&request.runs_root, &run_dir)?;
    let mut sink = FileArtifactSink::new(run_dir.clone())?;
    let builder = RunpackBuilder::default();
    let (manifest, verification) = if request.verify_after_write {
        let reader = FileArtifactReader::new(run_dir.clone())?;
        let (manifest, report) =
            builder.build_with_verification(&mut sink, &reader, &outcome, &revised, &inputs)?;
        if report.status == VerificationStatus::Fail {
            return Err(PipelineError::Verification(report.errors.join("; ")));
        }
        (manifest, Some(report))
    } else {
        (builder.build(&mut sink, &outcome, &revised, &inputs)?, None)
    };

    let generated_at = request.timestamp.to_rfc3339()?;
    let mut ledger = GovernanceLedger::new(request.run_id.clone(), generated_at);
    ledger.record_inputs(&inputs);
    ledger.record_runpack(&manifest)?;
    let governance = ledger.write(&sink)?;

    info!(
        run_id = %request.run_id,
        run_dir = %run_dir.display(),
        status = outcome.summary.status.as_str(),
        artifacts = manifest.artifacts.len(),
        "runpack written"
    );
    Ok(RunReport {
        run_dir,
        manifest,
        summary: outcome.summary,
        verification,
        governance,
    })
}

// ============================================================================
// SECTION: Gate Only
// ============================================================================

/// Evaluates gates without touching a document.
///
/// With a patch spec, only the questions its valid patches reference are
/// evaluated; otherwise every configured question is.
///
/// # Errors
///
/// Returns [`PipelineError`] when an input cannot be read or parsed.
pub fn evaluate_gates(request: &GateRequest) -> Result<GateReport, PipelineError> {
    let limits = &request.limits;
    let registry = load_registry(&request.sources, limits.max_registry_bytes)?;
    let gate_text =
        read_utf8_file(&request.gate_config, "gate config", limits.max_gate_config_bytes)?;
    let gate_config: GateConfig = parse_gate_config(&gate_text)?;
    let Some(patch_spec) = &request.patch_spec else {
        return Ok(EvidenceGateEvaluator::default().evaluate_all(
            gate_config.questions.keys(),
            &gate_config,
            &registry,
        ));
    };
    let patch_bytes = read_bounded_file(patch_spec, "patch spec", limits.max_patch_spec_bytes)?;
    let batch = PatchSpecLoader::new(&registry).load_json(&patch_bytes).map_err(|err| {
        PipelineError::PatchSpec {
            path: patch_spec.display().to_string(),
            message: err.to_string(),
        }
    })?;
    Ok(RevisionEngine::default().gate(&batch, &gate_config, &registry))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a source registry in the format its extension names.
fn load_registry(path: &Path, max_bytes: usize) -> Result<SourceRegistry, PipelineError> {
    let format = RegistryFormat::from_path(path)?;
    let text = read_utf8_file(path, "source registry", max_bytes)?;
    Ok(parse_source_registry(&text, format)?)
}

/// Fingerprints one input file.
fn input_record(role: InputRole, path: &Path, bytes: &[u8]) -> InputRecord {
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().to_string());
    InputRecord::new(role, name, ContentFingerprint::of(DEFAULT_HASH_ALGORITHM, bytes))
}

/// Creates the run directory, failing when it already exists.
fn create_run_dir(runs_root: &Path, run_dir: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(runs_root).map_err(|err| PipelineError::RunDirectory {
        path: runs_root.display().to_string(),
        message: err.to_string(),
    })?;
    match fs::create_dir(run_dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            Err(PipelineError::RunDirectoryExists(run_dir.display().to_string()))
        }
        Err(err) => Err(PipelineError::RunDirectory {
            path: run_dir.display().to_string(),
            message: err.to_string(),
        }),
    }
}
