// crates/revision-gate-config/src/config.rs
// ============================================================================
// Module: Revision Gate Configuration
// Description: Configuration loading and validation for revision runs.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: revision-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `REVISION_GATE_CONFIG`, then
//! `revision-gate.toml` in the working directory. Only the implicit default
//! may be absent; an explicitly named file that cannot be read is an error.
//!
//! The bounded file readers here are shared by every input loader (registry,
//! gate declarations, patch specs, documents).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use revision_gate_core::DEFAULT_AUTHOR;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "revision-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "REVISION_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the revision author name.
pub(crate) const MAX_AUTHOR_LENGTH: usize = 256;
/// Default runs root directory.
const DEFAULT_RUNS_ROOT: &str = "runs";
/// Default maximum patch spec size in bytes.
const DEFAULT_MAX_PATCH_SPEC_BYTES: usize = 16 * 1024 * 1024;
/// Ceiling for the patch spec size limit.
const MAX_PATCH_SPEC_BYTES: usize = 64 * 1024 * 1024;
/// Default maximum input document size in bytes.
const DEFAULT_MAX_DOCUMENT_BYTES: usize = 256 * 1024 * 1024;
/// Ceiling for the input document size limit.
const MAX_DOCUMENT_BYTES: usize = 1024 * 1024 * 1024;
/// Default maximum source registry size in bytes.
const DEFAULT_MAX_REGISTRY_BYTES: usize = 4 * 1024 * 1024;
/// Ceiling for the source registry size limit.
const MAX_REGISTRY_BYTES: usize = 64 * 1024 * 1024;
/// Default maximum gate configuration size in bytes.
const DEFAULT_MAX_GATE_CONFIG_BYTES: usize = 4 * 1024 * 1024;
/// Ceiling for the gate configuration size limit.
const MAX_GATE_CONFIG_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Revision Gate run configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevisionGateConfig {
    /// Run behavior.
    #[serde(default)]
    pub run: RunConfig,
    /// Default input locations.
    #[serde(default)]
    pub inputs: InputsConfig,
    /// Output locations and post-write checks.
    #[serde(default)]
    pub output: OutputConfig,
    /// Input size limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// File the configuration was loaded from, if any (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl RevisionGateConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = env::var(CONFIG_ENV_VAR).ok();
        Self::load_resolved(resolve_path(path, env_path.as_deref())?)
    }

    /// Loads configuration from an already resolved path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_resolved(resolved: ResolvedPath) -> Result<Self, ConfigError> {
        let (path, required) = match resolved {
            ResolvedPath::Explicit(path) => (path, true),
            ResolvedPath::Default(path) => (path, false),
        };
        validate_path(&path)?;
        if !required && !path.exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let content = read_utf8_file(&path, "config file", MAX_CONFIG_FILE_SIZE)?;
        let mut config = Self::from_toml_str(&content)?;
        config.source_path = Some(path);
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.run.validate()?;
        self.inputs.validate()?;
        self.output.validate()?;
        self.limits.validate()
    }
}

/// Run behavior configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Author stamped on every tracked change.
    #[serde(default = "default_author")]
    pub author: String,
    /// Refuse documents that already carry tracked changes.
    #[serde(default)]
    pub require_clean_baseline: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            author: default_author(),
            require_clean_baseline: false,
        }
    }
}

impl RunConfig {
    /// Validates run settings.
    fn validate(&mut self) -> Result<(), ConfigError> {
        let trimmed = self.author.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("run.author must be non-empty".to_string()));
        }
        if trimmed.chars().count() > MAX_AUTHOR_LENGTH {
            return Err(ConfigError::Invalid("run.author exceeds max length".to_string()));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(
                "run.author must not contain control characters".to_string(),
            ));
        }
        self.author = trimmed.to_string();
        Ok(())
    }
}

/// Default input locations, overridden by CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputsConfig {
    /// Source registry snapshot path.
    #[serde(default)]
    pub source_registry: Option<String>,
    /// Gate configuration path.
    #[serde(default)]
    pub gate_config: Option<String>,
}

impl InputsConfig {
    /// Validates configured paths.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.source_registry {
            validate_path_string("inputs.source_registry", path)?;
        }
        if let Some(path) = &self.gate_config {
            validate_path_string("inputs.gate_config", path)?;
        }
        Ok(())
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory that holds one subdirectory per run.
    #[serde(default = "default_runs_root")]
    pub runs_root: String,
    /// Re-hash every artifact after the runpack is written.
    #[serde(default = "default_true")]
    pub verify_after_write: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            runs_root: default_runs_root(),
            verify_after_write: true,
        }
    }
}

impl OutputConfig {
    /// Validates output settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("output.runs_root", &self.runs_root)
    }
}

/// Input size limits in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest patch spec accepted.
    #[serde(default = "default_max_patch_spec_bytes")]
    pub max_patch_spec_bytes: usize,
    /// Largest input document accepted.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
    /// Largest source registry snapshot accepted.
    #[serde(default = "default_max_registry_bytes")]
    pub max_registry_bytes: usize,
    /// Largest gate configuration accepted.
    #[serde(default = "default_max_gate_config_bytes")]
    pub max_gate_config_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_patch_spec_bytes: DEFAULT_MAX_PATCH_SPEC_BYTES,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_registry_bytes: DEFAULT_MAX_REGISTRY_BYTES,
            max_gate_config_bytes: DEFAULT_MAX_GATE_CONFIG_BYTES,
        }
    }
}

impl LimitsConfig {
    /// Validates every limit against its ceiling.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_limit(
            "limits.max_patch_spec_bytes",
            self.max_patch_spec_bytes,
            MAX_PATCH_SPEC_BYTES,
        )?;
        validate_limit("limits.max_document_bytes", self.max_document_bytes, MAX_DOCUMENT_BYTES)?;
        validate_limit("limits.max_registry_bytes", self.max_registry_bytes, MAX_REGISTRY_BYTES)?;
        validate_limit(
            "limits.max_gate_config_bytes",
            self.max_gate_config_bytes,
            MAX_GATE_CONFIG_BYTES,
        )
    }
}

// ============================================================================
// SECTION: Path Resolution
// ============================================================================

/// Config path and whether it was asked for explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPath {
    /// Named by the caller or the environment; must exist.
    Explicit(PathBuf),
    /// Working-directory default; may be absent.
    Default(PathBuf),
}

/// Resolves the config path from the caller, the environment, or the default.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the environment path is too long.
pub fn resolve_path(
    path: Option<&Path>,
    env_path: Option<&str>,
) -> Result<ResolvedPath, ConfigError> {
    if let Some(path) = path {
        return Ok(ResolvedPath::Explicit(path.to_path_buf()));
    }
    if let Some(env_path) = env_path.filter(|value| !value.trim().is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ResolvedPath::Explicit(PathBuf::from(env_path)));
    }
    Ok(ResolvedPath::Default(PathBuf::from(DEFAULT_CONFIG_NAME)))
}

// ============================================================================
// SECTION: Bounded Readers
// ============================================================================

/// Reads a file of at most `max_bytes`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the path is invalid, the file cannot be read,
/// or it exceeds the limit.
pub fn read_bounded_file(
    path: &Path,
    label: &str,
    max_bytes: usize,
) -> Result<Vec<u8>, ConfigError> {
    validate_path(path)?;
    let file = fs::File::open(path)
        .map_err(|err| ConfigError::Io(format!("{label} {}: {err}", path.display())))?;
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| ConfigError::Io(format!("{label} {}: {err}", path.display())))?;
    if bytes.len() > max_bytes {
        return Err(ConfigError::Invalid(format!("{label} exceeds size limit")));
    }
    Ok(bytes)
}

/// Reads a UTF-8 text file of at most `max_bytes`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, exceeds the limit,
/// or is not UTF-8.
pub fn read_utf8_file(path: &Path, label: &str, max_bytes: usize) -> Result<String, ConfigError> {
    let bytes = read_bounded_file(path, label, max_bytes)?;
    String::from_utf8(bytes).map_err(|_| ConfigError::Invalid(format!("{label} must be utf-8")))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or inputs.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML or JSON parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a path against length limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a size limit.
fn validate_limit(field: &str, value: usize, ceiling: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
    }
    if value > ceiling {
        return Err(ConfigError::Invalid(format!("{field} exceeds maximum of {ceiling}")));
    }
    Ok(())
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

fn default_runs_root() -> String {
    DEFAULT_RUNS_ROOT.to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_patch_spec_bytes() -> usize {
    DEFAULT_MAX_PATCH_SPEC_BYTES
}

const fn default_max_document_bytes() -> usize {
    DEFAULT_MAX_DOCUMENT_BYTES
}

const fn default_max_registry_bytes() -> usize {
    DEFAULT_MAX_REGISTRY_BYTES
}

const fn default_max_gate_config_bytes() -> usize {
    DEFAULT_MAX_GATE_CONFIG_BYTES
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only output and panic-based assertions are permitted."
    )]

    use super::*;

    #[test]
    fn resolve_path_prefers_explicit_path() {
        let resolved = resolve_path(Some(Path::new("a.toml")), Some("b.toml")).unwrap();
        assert_eq!(resolved, ResolvedPath::Explicit(PathBuf::from("a.toml")));
    }

    #[test]
    fn resolve_path_uses_environment_before_default() {
        let resolved = resolve_path(None, Some("env.toml")).unwrap();
        assert_eq!(resolved, ResolvedPath::Explicit(PathBuf::from("env.toml")));
    }

    #[test]
    fn resolve_path_ignores_blank_environment() {
        let resolved = resolve_path(None, Some("  ")).unwrap();
        assert_eq!(resolved, ResolvedPath::Default(PathBuf::from(DEFAULT_CONFIG_NAME)));
    }

    #[test]
    fn resolve_path_rejects_oversized_environment_path() {
        let long = "a".repeat(MAX_TOTAL_PATH_LENGTH + 1);
        let err = resolve_path(None, Some(&long)).unwrap_err();
        assert!(err.to_string().contains("config path exceeds max length"));
    }

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        let err = validate_path_string("output.runs_root", "   ").unwrap_err();
        assert!(err.to_string().contains("output.runs_root must be non-empty"));
    }

    #[test]
    fn validate_path_string_rejects_component_too_long() {
        let value = format!("runs/{}", "c".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
        let err = validate_path_string("output.runs_root", &value).unwrap_err();
        assert!(err.to_string().contains("path component too long"));
    }

    #[test]
    fn validate_limit_enforces_bounds() {
        assert!(validate_limit("limits.x", 0, 10).is_err());
        assert!(validate_limit("limits.x", 11, 10).is_err());
        assert!(validate_limit("limits.x", 10, 10).is_ok());
    }

    #[test]
    fn run_author_is_trimmed() {
        let mut run = RunConfig {
            author: "  Jane Reviewer ".to_string(),
            require_clean_baseline: false,
        };
        run.validate().unwrap();
        assert_eq!(run.author, "Jane Reviewer");
    }
}
