// crates/revision-gate-config/src/gate.rs
// ============================================================================
// Module: Gate Configuration Loader
// Description: Reads per-question evidence declarations from JSON.
// Purpose: Validate gate declarations before any question is evaluated.
// Dependencies: revision-gate-core, serde_json
// ============================================================================

//! ## Overview
//! The gate configuration is a JSON object keyed by question id:
//!
//! ```json
//! { "q1": { "required_sources": ["oecd-2024"], "claim": "core" } }
//! ```
//!
//! `claim` defaults to `core`. Blank ids and sources listed twice for the
//! same question are rejected here; sources that do not resolve in the
//! registry are left for the gate to report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use revision_gate_core::GateConfig;
use revision_gate_core::QuestionGate;

use crate::config::ConfigError;
use crate::config::read_utf8_file;

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads gate declarations from disk.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, exceeds
/// `max_bytes`, or holds invalid declarations.
pub fn load_gate_config(path: &Path, max_bytes: usize) -> Result<GateConfig, ConfigError> {
    let content = read_utf8_file(path, "gate config", max_bytes)?;
    parse_gate_config(&content)
}

/// Parses gate declaration text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed JSON and
/// [`ConfigError::Invalid`] for blank or duplicated ids.
pub fn parse_gate_config(content: &str) -> Result<GateConfig, ConfigError> {
    let config: GateConfig =
        serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
    for (question_id, gate) in &config.questions {
        if question_id.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("gate config has a blank question id".to_string()));
        }
        validate_question(question_id.as_str(), gate)?;
    }
    Ok(config)
}

/// Checks one question's source lists.
fn validate_question(question_id: &str, gate: &QuestionGate) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for source_id in gate.required_sources.iter().chain(&gate.optional_sources) {
        if source_id.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "question {question_id} lists a blank source id"
            )));
        }
        if !seen.insert(source_id) {
            return Err(ConfigError::Invalid(format!(
                "question {question_id} lists source {source_id} more than once"
            )));
        }
    }
    Ok(())
}
