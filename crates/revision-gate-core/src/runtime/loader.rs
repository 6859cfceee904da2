// crates/revision-gate-core/src/runtime/loader.rs
// ============================================================================
// Module: Revision Gate Patch Loader
// Description: Converts declarative patch records into validated patch specs.
// Purpose: Report every invalid field of every record in one pass.
// Dependencies: crate::core, serde_json, tracing
// ============================================================================

//! ## Overview
//! The loader accepts either a bare JSON array of patch records or an object
//! `{ "patches": [...], "footnote_sources": { key: text } }`. Records are read
//! field by field from untyped JSON so that a wrong type in one field becomes
//! a [`FieldViolation`] rather than aborting the whole batch. A record with
//! any violation is rejected on its own; the rest of the batch still loads.
//!
//! Only a payload whose outer shape is unusable (not JSON, not an array or
//! object, malformed `footnote_sources`) fails the whole load.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::core::FieldViolation;
use crate::core::FootnoteRef;
use crate::core::MalformedPatchSpecError;
use crate::core::PatchBatch;
use crate::core::PatchId;
use crate::core::PatchOperation;
use crate::core::PatchSpec;
use crate::core::QuestionId;
use crate::core::RejectedPatch;
use crate::core::SourceId;
use crate::core::SourceRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fields a patch record may carry.
const KNOWN_FIELDS: [&str; 10] = [
    "patch_id",
    "label",
    "question_id",
    "operation",
    "anchor",
    "replacement",
    "reason",
    "source_refs",
    "footnote_refs",
    "question_anchor",
];

/// Characters that may never appear in an anchor.
const FORBIDDEN_ANCHOR_CHARS: [char; 2] = ['\u{0}', '\u{FFFC}'];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that prevent a patch batch from loading at all.
#[derive(Debug, Error)]
pub enum PatchLoadError {
    /// Payload is not valid JSON.
    #[error("patch spec is not valid json: {0}")]
    Parse(String),
    /// Payload has an unusable outer shape.
    #[error("patch spec has invalid shape: {0}")]
    Shape(String),
}

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Validates patch records against a source registry.
#[derive(Debug, Clone, Copy)]
pub struct PatchSpecLoader<'a> {
    /// Registry every source ref must resolve in.
    registry: &'a SourceRegistry,
}

impl<'a> PatchSpecLoader<'a> {
    /// Creates a loader bound to a registry snapshot.
    #[must_use]
    pub const fn new(registry: &'a SourceRegistry) -> Self {
        Self {
            registry,
        }
    }

    /// Loads a batch from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PatchLoadError`] when the payload cannot be read as a batch.
    pub fn load_json(&self, bytes: &[u8]) -> Result<PatchBatch, PatchLoadError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|err| PatchLoadError::Parse(err.to_string()))?;
        self.load_value(value)
    }

    /// Loads a batch from a parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`PatchLoadError::Shape`] when the outer shape is unusable.
    pub fn load_value(&self, value: Value) -> Result<PatchBatch, PatchLoadError> {
        let (records, footnote_sources) = split_payload(value)?;
        let mut batch = PatchBatch {
            footnote_sources,
            ..PatchBatch::default()
        };
        let mut seen_ids: BTreeMap<String, usize> = BTreeMap::new();

        for (position, record) in records.into_iter().enumerate() {
            match self.validate_record(position, &record, &batch.footnote_sources, &mut seen_ids) {
                Ok(patch) => batch.patches.push(patch),
                Err(rejected) => {
                    warn!(
                        patch_id = %rejected.patch_id,
                        position,
                        violations = rejected.error.violations.len(),
                        "patch record rejected"
                    );
                    batch.rejected.push(*rejected);
                }
            }
        }

        info!(
            valid = batch.patches.len(),
            rejected = batch.rejected.len(),
            footnote_sources = batch.footnote_sources.len(),
            "patch spec loaded"
        );
        Ok(batch)
    }

    /// Validates one record, collecting every violation.
    fn validate_record(
        &self,
        position: usize,
        record: &Value,
        footnote_sources: &BTreeMap<String, String>,
        seen_ids: &mut BTreeMap<String, usize>,
    ) -> Result<PatchSpec, Box<RejectedPatch>> {
        let mut violations = Vec::new();
        let empty = Map::new();
        let map = if let Value::Object(map) = record {
            map
        } else {
            violations.push(FieldViolation::new("record", "must be a json object"));
            &empty
        };

        for key in map.keys() {
            if !KNOWN_FIELDS.contains(&key.as_str()) {
                violations.push(FieldViolation::new(key.clone(), "unknown field"));
            }
        }

        let patch_id = read_patch_id(map, position, seen_ids, &mut violations);
        let question_id = read_required_text(map, "question_id", &mut violations);
        let operation = read_operation(map, &mut violations);
        let anchor = read_required_text(map, "anchor", &mut violations);
        if let Some(anchor) = &anchor {
            if anchor.chars().any(|ch| FORBIDDEN_ANCHOR_CHARS.contains(&ch)) {
                violations.push(FieldViolation::new("anchor", "contains a reserved character"));
            }
        }
        let replacement = read_string(map, "replacement", &mut violations);
        if matches!(map.get("replacement"), None | Some(Value::Null)) {
            violations.push(FieldViolation::new("replacement", "is required"));
        }
        match (&replacement, operation) {
            (Some(text), PatchOperation::Replace) if text.is_empty() => {
                violations.push(FieldViolation::new(
                    "replacement",
                    "must be non-empty for a replace operation",
                ));
            }
            (Some(text), PatchOperation::Delete) if !text.is_empty() => {
                violations.push(FieldViolation::new(
                    "replacement",
                    "must be empty for a delete operation",
                ));
            }
            _ => {}
        }
        let reason = read_required_text(map, "reason", &mut violations);
        let source_refs = self.read_source_refs(map, &mut violations);
        let footnote_refs = read_footnote_refs(map, footnote_sources, &mut violations);
        if operation == PatchOperation::Delete && !footnote_refs.is_empty() {
            violations.push(FieldViolation::new(
                "footnote_refs",
                "a delete operation cannot carry footnote references",
            ));
        }
        let question_anchor = read_string(map, "question_anchor", &mut violations);
        if question_anchor.as_deref().is_some_and(|text| text.trim().is_empty()) {
            violations.push(FieldViolation::new("question_anchor", "must be non-empty when set"));
        }

        match (question_id, anchor, replacement, reason) {
            (Some(question_id), Some(anchor), Some(replacement), Some(reason))
                if violations.is_empty() =>
            {
                Ok(PatchSpec {
                    patch_id,
                    position,
                    question_id: QuestionId::new(question_id),
                    operation,
                    anchor,
                    replacement,
                    reason,
                    source_refs,
                    footnote_refs,
                    question_anchor,
                })
            }
            (question_id, anchor, _, reason) => Err(Box::new(RejectedPatch {
                patch_id: patch_id.clone(),
                question_id: question_id.map(QuestionId::new),
                anchor: anchor.or_else(|| raw_string(map, "anchor")).unwrap_or_default(),
                reason: reason.or_else(|| raw_string(map, "reason")).unwrap_or_default(),
                source_refs: raw_source_refs(map),
                error: MalformedPatchSpecError {
                    patch_id,
                    position,
                    violations,
                },
            })),
        }
    }

    /// Reads and resolves `source_refs`.
    fn read_source_refs(
        &self,
        map: &Map<String, Value>,
        violations: &mut Vec<FieldViolation>,
    ) -> Vec<SourceId> {
        let Some(value) = map.get("source_refs") else {
            violations.push(FieldViolation::new("source_refs", "is required"));
            return Vec::new();
        };
        let Value::Array(items) = value else {
            violations.push(FieldViolation::new("source_refs", "must be an array of strings"));
            return Vec::new();
        };
        if items.is_empty() {
            violations.push(FieldViolation::new("source_refs", "must list at least one source"));
        }
        let mut refs = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let field = format!("source_refs[{index}]");
            let Some(text) = item.as_str().map(str::trim) else {
                violations.push(FieldViolation::new(field, "must be a string"));
                continue;
            };
            if text.is_empty() {
                violations.push(FieldViolation::new(field, "must be non-empty"));
                continue;
            }
            let id = SourceId::new(text);
            if refs.contains(&id) {
                violations.push(FieldViolation::new(field, format!("duplicate source {id}")));
                continue;
            }
            if let Err(err) = self.registry.resolve(&id) {
                violations.push(FieldViolation::new(field, err.to_string()));
            }
            refs.push(id);
        }
        refs
    }
}

// ============================================================================
// SECTION: Payload Shape
// ============================================================================

/// Splits a payload into records and footnote sources.
fn split_payload(value: Value) -> Result<(Vec<Value>, BTreeMap<String, String>), PatchLoadError> {
    match value {
        Value::Array(records) => Ok((records, BTreeMap::new())),
        Value::Object(mut map) => {
            let records = match map.remove("patches") {
                Some(Value::Array(records)) => records,
                Some(_) => {
                    return Err(PatchLoadError::Shape("patches must be an array".to_string()));
                }
                None => return Err(PatchLoadError::Shape("missing patches array".to_string())),
            };
            let footnote_sources = match map.remove("footnote_sources") {
                None | Some(Value::Null) => BTreeMap::new(),
                Some(Value::Object(sources)) => read_footnote_sources(sources)?,
                Some(_) => {
                    return Err(PatchLoadError::Shape(
                        "footnote_sources must be an object".to_string(),
                    ));
                }
            };
            if let Some(key) = map.keys().next() {
                return Err(PatchLoadError::Shape(format!("unknown top-level field {key}")));
            }
            Ok((records, footnote_sources))
        }
        _ => Err(PatchLoadError::Shape("expected an array or an object".to_string())),
    }
}

/// Reads the footnote source table.
fn read_footnote_sources(
    sources: Map<String, Value>,
) -> Result<BTreeMap<String, String>, PatchLoadError> {
    let mut out = BTreeMap::new();
    for (key, value) in sources {
        if !is_footnote_key(&key) {
            return Err(PatchLoadError::Shape(format!("footnote_sources key {key:?} is invalid")));
        }
        match value {
            Value::String(text) if !text.trim().is_empty() => {
                out.insert(key, text.trim().to_string());
            }
            _ => {
                return Err(PatchLoadError::Shape(format!(
                    "footnote_sources.{key} must be a non-empty string"
                )));
            }
        }
    }
    Ok(out)
}

// ============================================================================
// SECTION: Field Readers
// ============================================================================

/// Reads an optional string field, flagging wrong types.
fn read_string(
    map: &Map<String, Value>,
    field: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    match map.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => {
            violations.push(FieldViolation::new(field, "must be a string"));
            None
        }
    }
}

/// Reads a required string field that must contain non-whitespace text.
fn read_required_text(
    map: &Map<String, Value>,
    field: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    if matches!(map.get(field), None | Some(Value::Null)) {
        violations.push(FieldViolation::new(field, "is required"));
        return None;
    }
    let text = read_string(map, field, violations)?;
    if text.trim().is_empty() {
        violations.push(FieldViolation::new(field, "must be non-empty"));
        return None;
    }
    Some(text)
}

/// Reads `patch_id` (or its `label` alias), defaulting to a positional id.
fn read_patch_id(
    map: &Map<String, Value>,
    position: usize,
    seen_ids: &mut BTreeMap<String, usize>,
    violations: &mut Vec<FieldViolation>,
) -> PatchId {
    let field = if map.contains_key("patch_id") { "patch_id" } else { "label" };
    if map.contains_key("patch_id") && map.contains_key("label") {
        violations.push(FieldViolation::new("label", "conflicts with patch_id"));
    }
    let declared = read_string(map, field, violations).map(|text| text.trim().to_string());
    let id = match declared {
        Some(text) if text.is_empty() => {
            violations.push(FieldViolation::new(field, "must be non-empty when set"));
            PatchId::positional(position)
        }
        Some(text) => PatchId::new(text),
        None => PatchId::positional(position),
    };
    if let Some(first) = seen_ids.get(id.as_str()) {
        violations
            .push(FieldViolation::new(field, format!("duplicate patch id {id} (record {first})")));
    } else {
        seen_ids.insert(id.as_str().to_string(), position);
    }
    id
}

/// Reads `operation`, defaulting to replace.
fn read_operation(
    map: &Map<String, Value>,
    violations: &mut Vec<FieldViolation>,
) -> PatchOperation {
    match read_string(map, "operation", violations).as_deref() {
        None | Some("replace") => PatchOperation::Replace,
        Some("delete") => PatchOperation::Delete,
        Some(other) => {
            violations.push(FieldViolation::new(
                "operation",
                format!("unsupported operation {other:?} (expected replace or delete)"),
            ));
            PatchOperation::Replace
        }
    }
}

/// Reads `footnote_refs`.
fn read_footnote_refs(
    map: &Map<String, Value>,
    footnote_sources: &BTreeMap<String, String>,
    violations: &mut Vec<FieldViolation>,
) -> Vec<FootnoteRef> {
    let items = match map.get("footnote_refs") {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            violations.push(FieldViolation::new("footnote_refs", "must be an array"));
            return Vec::new();
        }
    };
    let mut refs = Vec::new();
    let mut seen = BTreeSet::new();
    for (index, item) in items.iter().enumerate() {
        let field = format!("footnote_refs[{index}]");
        let parsed = match item {
            Value::Number(number) => number
                .as_u64()
                .and_then(|id| u32::try_from(id).ok())
                .map(FootnoteRef::Existing)
                .ok_or_else(|| "footnote id must be a non-negative integer".to_string()),
            Value::String(token) => parse_footnote_token(token),
            _ => Err("must be a footnote id or token".to_string()),
        };
        match parsed {
            Ok(FootnoteRef::New(key)) if !footnote_sources.contains_key(&key) => {
                violations.push(FieldViolation::new(
                    field,
                    format!("footnote key {key} is not defined in footnote_sources"),
                ));
            }
            Ok(reference) => {
                if seen.insert(reference.to_string()) {
                    refs.push(reference);
                } else {
                    let message = format!("duplicate reference {reference}");
                    violations.push(FieldViolation::new(field, message));
                }
            }
            Err(message) => violations.push(FieldViolation::new(field, message)),
        }
    }
    refs
}

/// Parses `fnid:12`, `12`, `fn:key`, optionally wrapped in `[[...]]`.
fn parse_footnote_token(token: &str) -> Result<FootnoteRef, String> {
    let trimmed = token.trim();
    let inner = trimmed
        .strip_prefix("[[")
        .and_then(|rest| rest.strip_suffix("]]"))
        .unwrap_or(trimmed);
    if let Some(key) = inner.strip_prefix("fn:") {
        if is_footnote_key(key) {
            return Ok(FootnoteRef::New(key.to_string()));
        }
        return Err(format!("invalid footnote key {key:?}"));
    }
    let digits = inner.strip_prefix("fnid:").unwrap_or(inner);
    digits
        .parse::<u32>()
        .map(FootnoteRef::Existing)
        .map_err(|_| format!("invalid footnote reference {token:?}"))
}

/// Footnote keys are ASCII alphanumerics and underscores.
fn is_footnote_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Returns a string field verbatim for audit purposes.
fn raw_string(map: &Map<String, Value>, field: &str) -> Option<String> {
    map.get(field).and_then(Value::as_str).map(ToString::to_string)
}

/// Returns string source refs verbatim for audit purposes.
fn raw_source_refs(map: &Map<String, Value>) -> Vec<SourceId> {
    map.get("source_refs")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|text| !text.trim().is_empty())
                .map(|text| SourceId::new(text.trim()))
                .collect()
        })
        .unwrap_or_default()
}
