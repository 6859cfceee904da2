// crates/revision-gate-config/src/registry.rs
// ============================================================================
// Module: Source Registry Loader
// Description: Reads source registry snapshots from TOML or JSON files.
// Purpose: Turn an on-disk snapshot into the core's read-only registry.
// Dependencies: revision-gate-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! A registry snapshot lists every evidence source a run may cite. Both
//! formats share one shape, a `sources` table keyed by source id:
//!
//! ```toml
//! [sources.oecd-2024]
//! kind = "required"
//! fulltext_available = true
//! locator = "library/oecd-2024.pdf"
//! ```
//!
//! The format is chosen by file extension. Unknown fields are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use revision_gate_core::SourceId;
use revision_gate_core::SourceKind;
use revision_gate_core::SourceRecord;
use revision_gate_core::SourceRegistry;
use serde::Deserialize;

use crate::config::ConfigError;
use crate::config::read_utf8_file;

// ============================================================================
// SECTION: Types
// ============================================================================

/// On-disk registry encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryFormat {
    /// `.toml` snapshot.
    Toml,
    /// `.json` snapshot.
    Json,
}

impl RegistryFormat {
    /// Picks the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any extension other than
    /// `toml` or `json`.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::Invalid(format!(
                "source registry {} must have a .toml or .json extension",
                path.display()
            ))),
        }
    }
}

/// Registry snapshot as written on disk.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    /// Entries keyed by source id.
    #[serde(default)]
    sources: BTreeMap<String, SourceEntry>,
}

/// One registry entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceEntry {
    /// Registry classification.
    kind: SourceKind,
    /// Whether fulltext is on hand.
    fulltext_available: bool,
    /// Where the evidence lives.
    locator: String,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads a registry snapshot from disk.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, exceeds
/// `max_bytes`, or does not describe a valid registry.
pub fn load_source_registry(path: &Path, max_bytes: usize) -> Result<SourceRegistry, ConfigError> {
    let format = RegistryFormat::from_path(path)?;
    let content = read_utf8_file(path, "source registry", max_bytes)?;
    parse_source_registry(&content, format)
}

/// Parses registry snapshot text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed text and
/// [`ConfigError::Invalid`] when the records break a registry rule.
pub fn parse_source_registry(
    content: &str,
    format: RegistryFormat,
) -> Result<SourceRegistry, ConfigError> {
    let file: RegistryFile = match format {
        RegistryFormat::Toml => {
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?
        }
        RegistryFormat::Json => {
            serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?
        }
    };
    let records = file.sources.into_iter().map(|(id, entry)| SourceRecord {
        id: SourceId::new(id.trim()),
        kind: entry.kind,
        fulltext_available: entry.fulltext_available,
        locator: entry.locator.trim().to_string(),
    });
    SourceRegistry::from_records(records).map_err(|err| ConfigError::Invalid(err.to_string()))
}
