// crates/revision-gate-cli/src/main.rs
// ============================================================================
// Module: Revision Gate CLI Entry Point
// Description: Command dispatcher for revision runs and runpack workflows.
// Purpose: Resolve flags against config, run the pipeline, and report results.
// Dependencies: clap, revision-gate-{cli, config, core}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `revision-gate` runs evidence-gated revisions of `.docx` files and works
//! with the runpacks those runs leave behind. Command results go to stdout as
//! JSON (or markdown for `runpack verify --format markdown`); logs and errors
//! go to stderr. Flags override config values, which override defaults.
//!
//! Exit codes: a run that completes exits 0 whether or not it applied any
//! patch; a run that cannot start or cannot write its outputs exits 1.
//! `runpack verify` exits 1 when verification fails.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use revision_gate_cli::artifacts::FileArtifactReader;
use revision_gate_cli::logging::init_logging;
use revision_gate_cli::pipeline::GateRequest;
use revision_gate_cli::pipeline::RunReport;
use revision_gate_cli::pipeline::RunRequest;
use revision_gate_cli::pipeline::evaluate_gates;
use revision_gate_cli::pipeline::execute_run;
use revision_gate_cli::query::query_question;
use revision_gate_cli::run_id::mint_run_id;
use revision_gate_cli::run_id::parse_run_id;
use revision_gate_config::RevisionGateConfig;
use revision_gate_config::read_bounded_file;
use revision_gate_core::DEFAULT_HASH_ALGORITHM;
use revision_gate_core::RunStatus;
use revision_gate_core::RunSummary;
use revision_gate_core::RunpackManifest;
use revision_gate_core::RunpackVerifier;
use revision_gate_core::Timestamp;
use revision_gate_core::VerificationReport;
use revision_gate_core::VerificationStatus;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest runpack manifest `runpack verify` reads.
const MAX_MANIFEST_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "revision-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Revise a document with gated tracked changes and write a runpack.
    Run(RunCommand),
    /// Evaluate evidence gates and print the gate report.
    Gate(GateCommand),
    /// Runpack utilities.
    Runpack {
        /// Selected runpack subcommand.
        #[command(subcommand)]
        command: RunpackCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Show what a runpack records about one question.
    Query(QueryCommand),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Document to revise (.docx).
    #[arg(long, value_name = "PATH")]
    input_docx: PathBuf,
    /// Patch spec JSON.
    #[arg(long, value_name = "PATH")]
    patch_spec: PathBuf,
    /// Source registry snapshot (defaults to `[inputs].source_registry`).
    #[arg(long, value_name = "PATH")]
    sources: Option<PathBuf>,
    /// Gate configuration JSON (defaults to `[inputs].gate_config`).
    #[arg(long, value_name = "PATH")]
    gate_config: Option<PathBuf>,
    /// Config file path (defaults to revision-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Run id (`YYYYMMDDTHHMMSSZ_XXXXXX`); minted when omitted.
    #[arg(long, value_name = "ID")]
    run_id: Option<String>,
    /// Directory holding run directories (defaults to `[output].runs_root`).
    #[arg(long, value_name = "DIR")]
    runs_root: Option<PathBuf>,
    /// Author stamped on tracked changes (defaults to `[run].author`).
    #[arg(long, value_name = "NAME")]
    author: Option<String>,
    /// Revision date (RFC 3339); the current time when omitted.
    #[arg(long, value_name = "RFC3339")]
    date: Option<String>,
    /// Fail when the input already contains tracked changes.
    #[arg(long, action = ArgAction::SetTrue)]
    require_clean_baseline: bool,
}

/// Arguments for `gate`.
#[derive(Args, Debug)]
struct GateCommand {
    /// Gate configuration JSON.
    #[arg(long, value_name = "PATH")]
    gate_config: PathBuf,
    /// Source registry snapshot.
    #[arg(long, value_name = "PATH")]
    sources: PathBuf,
    /// Patch spec JSON; limits evaluation to the questions it references.
    #[arg(long, value_name = "PATH")]
    patch_spec: Option<PathBuf>,
    /// Config file path for input limits.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Runpack subcommands.
#[derive(Subcommand, Debug)]
enum RunpackCommand {
    /// Verify a runpack manifest against its artifacts.
    Verify(RunpackVerifyCommand),
}

/// Arguments for runpack verification.
#[derive(Args, Debug)]
struct RunpackVerifyCommand {
    /// Path to the runpack manifest JSON file.
    #[arg(long, value_name = "PATH")]
    manifest: PathBuf,
    /// Root directory for runpack artifacts (defaults to manifest directory).
    #[arg(long, value_name = "DIR")]
    runpack_dir: Option<PathBuf>,
    /// Output format for the verification report.
    #[arg(long, value_enum, default_value_t = VerifyFormat::Json)]
    format: VerifyFormat,
}

/// Output formats for verification reports.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum VerifyFormat {
    /// Canonical JSON output.
    Json,
    /// Markdown summary output.
    Markdown,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to revision-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `query`.
#[derive(Args, Debug)]
struct QueryCommand {
    /// Run directory holding `runpack.json`.
    #[arg(long, value_name = "DIR")]
    runpack_dir: PathBuf,
    /// Question id to look up.
    #[arg(long, value_name = "ID")]
    question: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_logging();
    match cli.command {
        Commands::Run(command) => command_run(&command),
        Commands::Gate(command) => command_gate(&command),
        Commands::Runpack {
            command,
        } => match command {
            RunpackCommand::Verify(command) => command_runpack_verify(&command),
        },
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
        Commands::Query(command) => command_query(&command),
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Machine-readable result of `run`.
#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    /// Run identifier.
    run_id: &'a str,
    /// Run directory.
    run_dir: String,
    /// Final status label.
    status: &'static str,
    /// Root hash of the runpack manifest.
    root_hash: &'a str,
    /// Verification status, when verification ran.
    verification: Option<VerificationStatus>,
    /// Governance manifest paths, runpack-relative.
    manifests: [&'a str; 2],
    /// Full run summary.
    summary: &'a RunSummary,
}

/// Executes `run`.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let config = RevisionGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    let request = resolve_run_request(command, &config, now())?;
    let report = execute_run(&request).map_err(|err| {
        CliError::new(format!("run {} failed: {err}", request.run_id))
    })?;
    let output = render_run_output(&report)?;
    write_stdout_line(&output).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(run_exit_code(report.summary.status))
}

/// Merges flags, config values, and defaults into a run request.
fn resolve_run_request(
    command: &RunCommand,
    config: &RevisionGateConfig,
    now: Timestamp,
) -> CliResult<RunRequest> {
    let sources = command
        .sources
        .clone()
        .or_else(|| config.inputs.source_registry.as_ref().map(PathBuf::from))
        .ok_or_else(|| {
            CliError::new(
                "a source registry is required (--sources or [inputs].source_registry)"
                    .to_string(),
            )
        })?;
    let gate_config = command
        .gate_config
        .clone()
        .or_else(|| config.inputs.gate_config.as_ref().map(PathBuf::from))
        .ok_or_else(|| {
            CliError::new(
                "a gate config is required (--gate-config or [inputs].gate_config)".to_string(),
            )
        })?;
    let timestamp = match &command.date {
        Some(value) => Timestamp::parse_rfc3339(value)
            .map_err(|err| CliError::new(format!("invalid --date: {err}")))?,
        None => now,
    };
    let run_id = match &command.run_id {
        Some(value) => parse_run_id(value).map_err(|err| CliError::new(err.to_string()))?,
        None => mint_run_id(timestamp).map_err(|err| CliError::new(err.to_string()))?,
    };
    let author = command.author.clone().unwrap_or_else(|| config.run.author.clone());
    if author.trim().is_empty() {
        return Err(CliError::new("author must be non-empty".to_string()));
    }
    Ok(RunRequest {
        input_docx: command.input_docx.clone(),
        patch_spec: command.patch_spec.clone(),
        sources,
        gate_config,
        run_id,
        runs_root: command
            .runs_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.runs_root)),
        author,
        timestamp,
        require_clean_baseline: command.require_clean_baseline
            || config.run.require_clean_baseline,
        verify_after_write: config.output.verify_after_write,
        limits: config.limits.clone(),
    })
}

/// Exit code for a finished run.
const fn run_exit_code(status: RunStatus) -> ExitCode {
    match status {
        RunStatus::Completed | RunStatus::CompletedNoRevisions => ExitCode::SUCCESS,
        RunStatus::Failed => ExitCode::FAILURE,
    }
}

/// Renders the `run` result as JSON.
fn render_run_output(report: &RunReport) -> CliResult<String> {
    let output = RunOutput {
        run_id: report.manifest.run_id.as_str(),
        run_dir: report.run_dir.display().to_string(),
        status: report.summary.status.as_str(),
        root_hash: &report.manifest.integrity.root_hash.value,
        verification: report.verification.as_ref().map(|verification| verification.status),
        manifests: [
            report.governance.sync_manifest.as_str(),
            report.governance.deleted_manifest.as_str(),
        ],
        summary: &report.summary,
    };
    serde_json::to_string_pretty(&output)
        .map_err(|err| CliError::new(format!("unable to render run output: {err}")))
}

/// Current wall-clock time.
fn now() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
    Timestamp::UnixMillis(millis)
}

// ============================================================================
// SECTION: Gate Command
// ============================================================================

/// Executes `gate`.
fn command_gate(command: &GateCommand) -> CliResult<ExitCode> {
    let config = RevisionGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    let request = GateRequest {
        sources: command.sources.clone(),
        gate_config: command.gate_config.clone(),
        patch_spec: command.patch_spec.clone(),
        limits: config.limits,
    };
    let report = evaluate_gates(&request)
        .map_err(|err| CliError::new(format!("gate evaluation failed: {err}")))?;
    let output = serde_json::to_string_pretty(&report)
        .map_err(|err| CliError::new(format!("unable to render gate report: {err}")))?;
    write_stdout_line(&output).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Runpack Commands
// ============================================================================

/// Executes `runpack verify`.
fn command_runpack_verify(command: &RunpackVerifyCommand) -> CliResult<ExitCode> {
    let bytes = read_bounded_file(&command.manifest, "runpack manifest", MAX_MANIFEST_BYTES)
        .map_err(|err| CliError::new(format!("runpack verification failed: {err}")))?;
    let manifest: RunpackManifest = serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(format!(
            "unable to parse runpack manifest {}: {err}",
            command.manifest.display()
        ))
    })?;
    let runpack_dir = resolve_runpack_dir(&command.manifest, command.runpack_dir.clone());
    let reader = FileArtifactReader::new(runpack_dir.clone()).map_err(|err| {
        CliError::new(format!("unable to open runpack {}: {err}", runpack_dir.display()))
    })?;
    let report = RunpackVerifier::new(DEFAULT_HASH_ALGORITHM)
        .verify_manifest(&reader, &manifest)
        .map_err(|err| CliError::new(format!("runpack verification failed: {err}")))?;

    let output = render_verification_report(command.format, &report)?;
    write_stdout_line(&output).map_err(|err| CliError::new(output_error("stdout", &err)))?;

    let exit_code = match report.status {
        VerificationStatus::Pass => ExitCode::SUCCESS,
        VerificationStatus::Fail => ExitCode::FAILURE,
    };
    Ok(exit_code)
}

/// Resolves the runpack directory for verification.
fn resolve_runpack_dir(manifest: &Path, override_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir;
    }
    match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Renders a verification report in the requested format.
fn render_verification_report(
    format: VerifyFormat,
    report: &VerificationReport,
) -> CliResult<String> {
    match format {
        VerifyFormat::Json => {
            let bytes = serde_jcs::to_vec(report)
                .map_err(|err| CliError::new(format!("runpack verification failed: {err}")))?;
            String::from_utf8(bytes)
                .map_err(|err| CliError::new(format!("runpack verification failed: {err}")))
        }
        VerifyFormat::Markdown => Ok(render_verification_markdown(report)),
    }
}

/// Formats a verification report as markdown.
fn render_verification_markdown(report: &VerificationReport) -> String {
    let mut output = String::new();
    output.push_str("# Runpack Verification\n\n");
    output.push_str(&format!("- Status: {}\n", format_verification_status(report.status)));
    output.push_str(&format!("- Checked files: {}\n\n", report.checked_files));
    output.push_str("## Errors\n");
    if report.errors.is_empty() {
        output.push_str("- None\n");
        return output;
    }
    for error in &report.errors {
        output.push_str(&format!("- {error}\n"));
    }
    output
}

/// Stable label for a verification status.
const fn format_verification_status(status: VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Pass => "pass",
        VerificationStatus::Fail => "fail",
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes `config validate`.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = RevisionGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    let origin = config
        .source_path
        .as_ref()
        .map_or_else(|| "built-in defaults".to_string(), |path| path.display().to_string());
    write_stdout_line(&format!("Config valid ({origin})."))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Query Command
// ============================================================================

/// Executes `query`.
fn command_query(command: &QueryCommand) -> CliResult<ExitCode> {
    let report = query_question(command.runpack_dir.clone(), &command.question)
        .map_err(|err| CliError::new(format!("query failed: {err}")))?;
    let output = serde_json::to_string_pretty(&report)
        .map_err(|err| CliError::new(format!("unable to render query result: {err}")))?;
    write_stdout_line(&output).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
