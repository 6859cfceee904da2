//! Source registry and gate config loader tests for revision-gate-config.
// crates/revision-gate-config/tests/input_loaders.rs
// =============================================================================
// Module: Input Loader Tests
// Description: Validate registry snapshots and gate declarations.
// Purpose: Ensure evidence inputs are parsed strictly in both formats.
// =============================================================================

#![allow(
    clippy::use_debug,
    clippy::panic_in_result_fn,
    reason = "Test-only output and result-based assertions are permitted."
)]

use std::fs;

use revision_gate_config::RegistryFormat;
use revision_gate_config::load_gate_config;
use revision_gate_config::load_source_registry;
use revision_gate_config::parse_gate_config;
use revision_gate_config::parse_source_registry;
use revision_gate_core::ClaimClass;
use revision_gate_core::QuestionId;
use revision_gate_core::SourceId;
use revision_gate_core::SourceKind;

type TestResult = Result<(), String>;

const REGISTRY_TOML: &str = r#"
[sources.oecd-2024]
kind = "required"
fulltext_available = true
locator = "library/oecd-2024.pdf"

[sources.imf-brief]
kind = "optional"
fulltext_available = false
locator = "https://example.org/imf-brief"
"#;

fn expect_error<T>(result: Result<T, revision_gate_config::ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) if error.to_string().contains(needle) => Ok(()),
        Err(error) => Err(format!("error {error} did not contain {needle}")),
        Ok(_) => Err("expected an error".to_string()),
    }
}

// ============================================================================
// SECTION: Source Registry
// ============================================================================

#[test]
fn registry_toml_snapshot_loads_every_source() -> TestResult {
    let registry =
        parse_source_registry(REGISTRY_TOML, RegistryFormat::Toml).map_err(|err| err.to_string())?;
    if registry.len() != 2 {
        return Err(format!("expected 2 sources, got {}", registry.len()));
    }
    let record = registry.resolve(&SourceId::new("oecd-2024")).map_err(|err| err.to_string())?;
    if record.kind != SourceKind::Required || !record.fulltext_available {
        return Err(format!("unexpected record {record:?}"));
    }
    let optional = registry.resolve(&SourceId::new("imf-brief")).map_err(|err| err.to_string())?;
    if optional.kind != SourceKind::Optional || optional.fulltext_available {
        return Err(format!("unexpected record {optional:?}"));
    }
    Ok(())
}

#[test]
fn registry_json_snapshot_matches_toml() -> TestResult {
    let json = r#"{ "sources": {
        "oecd-2024": { "kind": "required", "fulltext_available": true, "locator": "library/oecd-2024.pdf" },
        "imf-brief": { "kind": "optional", "fulltext_available": false, "locator": "https://example.org/imf-brief" }
    } }"#;
    let from_json = parse_source_registry(json, RegistryFormat::Json).map_err(|err| err.to_string())?;
    let from_toml =
        parse_source_registry(REGISTRY_TOML, RegistryFormat::Toml).map_err(|err| err.to_string())?;
    if from_json != from_toml {
        return Err("json and toml snapshots differ".to_string());
    }
    Ok(())
}

#[test]
fn registry_format_follows_extension() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let toml_path = dir.path().join("sources.toml");
    fs::write(&toml_path, REGISTRY_TOML).map_err(|err| err.to_string())?;
    let registry = load_source_registry(&toml_path, 1024 * 1024).map_err(|err| err.to_string())?;
    if registry.len() != 2 {
        return Err("toml registry not loaded".to_string());
    }

    let yaml_path = dir.path().join("sources.yaml");
    fs::write(&yaml_path, REGISTRY_TOML).map_err(|err| err.to_string())?;
    expect_error(load_source_registry(&yaml_path, 1024 * 1024), "must have a .toml or .json extension")
}

#[test]
fn registry_rejects_blank_locator() -> TestResult {
    let toml = "[sources.s1]\nkind = \"required\"\nfulltext_available = true\nlocator = \" \"\n";
    expect_error(parse_source_registry(toml, RegistryFormat::Toml), "empty locator")
}

#[test]
fn registry_rejects_unknown_kind_and_fields() -> TestResult {
    let bad_kind = "[sources.s1]\nkind = \"primary\"\nfulltext_available = true\nlocator = \"x\"\n";
    expect_error(parse_source_registry(bad_kind, RegistryFormat::Toml), "config parse error")?;
    let extra = "[sources.s1]\nkind = \"required\"\nfulltext_available = true\nlocator = \"x\"\nnote = 1\n";
    expect_error(parse_source_registry(extra, RegistryFormat::Toml), "config parse error")
}

#[test]
fn registry_rejects_oversized_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("sources.toml");
    fs::write(&path, REGISTRY_TOML).map_err(|err| err.to_string())?;
    expect_error(load_source_registry(&path, 16), "source registry exceeds size limit")
}

// ============================================================================
// SECTION: Gate Config
// ============================================================================

#[test]
fn gate_config_defaults_claim_to_core() -> TestResult {
    let config = parse_gate_config(
        r#"{
            "q1": { "required_sources": ["oecd-2024"] },
            "q2": { "required_sources": ["imf-brief"], "optional_sources": ["oecd-2024"], "claim": "supporting" }
        }"#,
    )
    .map_err(|err| err.to_string())?;
    let q1 = config.question(&QuestionId::new("q1")).ok_or("q1 missing")?;
    if q1.claim != ClaimClass::Core || !q1.optional_sources.is_empty() {
        return Err(format!("unexpected q1 {q1:?}"));
    }
    let q2 = config.question(&QuestionId::new("q2")).ok_or("q2 missing")?;
    if q2.claim != ClaimClass::Supporting || q2.optional_sources.len() != 1 {
        return Err(format!("unexpected q2 {q2:?}"));
    }
    Ok(())
}

#[test]
fn gate_config_rejects_duplicate_sources() -> TestResult {
    expect_error(
        parse_gate_config(r#"{ "q1": { "required_sources": ["a"], "optional_sources": ["a"] } }"#),
        "more than once",
    )
}

#[test]
fn gate_config_rejects_blank_ids() -> TestResult {
    expect_error(parse_gate_config(r#"{ " ": { "required_sources": ["a"] } }"#), "blank question id")?;
    expect_error(parse_gate_config(r#"{ "q1": { "required_sources": [""] } }"#), "blank source id")
}

#[test]
fn gate_config_rejects_unknown_fields_and_claims() -> TestResult {
    expect_error(parse_gate_config(r#"{ "q1": { "required": ["a"] } }"#), "config parse error")?;
    expect_error(
        parse_gate_config(r#"{ "q1": { "required_sources": ["a"], "claim": "central" } }"#),
        "config parse error",
    )
}

#[test]
fn gate_config_loads_from_disk() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("gates.json");
    fs::write(&path, r#"{ "q1": { "required_sources": ["oecd-2024"] } }"#).map_err(|err| err.to_string())?;
    let config = load_gate_config(&path, 1024).map_err(|err| err.to_string())?;
    if config.questions.len() != 1 {
        return Err("expected one question".to_string());
    }
    expect_error(load_gate_config(&path, 4), "gate config exceeds size limit")
}
