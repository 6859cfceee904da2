// crates/revision-gate-core/src/core/source.rs
// ============================================================================
// Module: Revision Gate Source Registry
// Description: Evidence source records and the read-only registry snapshot.
// Purpose: Resolve source ids to their kind and fulltext availability.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! The source registry is loaded once at run start and shared read-only by
//! every gate evaluation and patch validation in the run. A lookup either
//! resolves to a [`SourceRecord`] or fails with [`SourceRegistryError`]; there
//! is no fallback record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::SourceId;

// ============================================================================
// SECTION: Source Records
// ============================================================================

/// Registry classification of a source.
///
/// Informational only: whether a source is required for a question is decided
/// by that question's gate declaration, never by this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Source is expected to back core claims.
    Required,
    /// Supplementary source.
    Optional,
}

/// One evidence source as declared in the registry snapshot.
///
/// # Invariants
/// - Immutable for the lifetime of a run.
/// - `locator` is non-empty; the registry loader rejects blank locators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Source identifier.
    pub id: SourceId,
    /// Registry classification.
    pub kind: SourceKind,
    /// True when the complete source text (not only an abstract) is on hand.
    pub fulltext_available: bool,
    /// Where the evidence lives (path, URL, or citation key).
    pub locator: String,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Read-only snapshot of every source known to a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRegistry {
    /// Records keyed by id.
    records: BTreeMap<SourceId, SourceRecord>,
}

impl SourceRegistry {
    /// Builds a registry from records.
    ///
    /// # Errors
    ///
    /// Returns [`SourceRegistryError`] for duplicate ids or blank fields.
    pub fn from_records(
        records: impl IntoIterator<Item = SourceRecord>,
    ) -> Result<Self, SourceRegistryError> {
        let mut map = BTreeMap::new();
        for record in records {
            if record.id.as_str().trim().is_empty() {
                return Err(SourceRegistryError::Invalid("source id must be non-empty".to_string()));
            }
            if record.locator.trim().is_empty() {
                return Err(SourceRegistryError::Invalid(format!(
                    "source {} has an empty locator",
                    record.id
                )));
            }
            if map.contains_key(&record.id) {
                return Err(SourceRegistryError::Duplicate(record.id));
            }
            map.insert(record.id.clone(), record);
        }
        Ok(Self {
            records: map,
        })
    }

    /// Resolves a source id.
    ///
    /// # Errors
    ///
    /// Returns [`SourceRegistryError::Unresolved`] when the id is unknown.
    pub fn resolve(&self, id: &SourceId) -> Result<&SourceRecord, SourceRegistryError> {
        self.records.get(id).ok_or_else(|| SourceRegistryError::Unresolved(id.clone()))
    }

    /// Returns the record for an id, if present.
    #[must_use]
    pub fn get(&self, id: &SourceId) -> Option<&SourceRecord> {
        self.records.get(id)
    }

    /// Iterates records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceRecord> {
        self.records.values()
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when no sources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Source registry lookup and construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceRegistryError {
    /// Referenced id is not in the registry.
    #[error("source id does not resolve: {0}")]
    Unresolved(SourceId),
    /// Same id declared twice.
    #[error("duplicate source id: {0}")]
    Duplicate(SourceId),
    /// Record failed a content rule.
    #[error("invalid source record: {0}")]
    Invalid(String),
}
