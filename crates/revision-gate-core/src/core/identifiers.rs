// crates/revision-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Revision Gate Identifiers
// Description: Opaque identifiers for sources, questions, patches, and runs.
// Purpose: Keep the different id namespaces from being mixed up at compile time.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are thin string wrappers that serialize transparently. Content
//! rules (non-empty, resolvable) are enforced where ids enter the system: the
//! patch loader, the source registry, and the run context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Evidence source identifier as declared in the source registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Creates a new source identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Sub-question identifier that evidence gates are keyed by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a new question identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for QuestionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Patch identifier, unique within one patch batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchId(String);

impl PatchId {
    /// Creates a new patch identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the positional default id (`patch-001`, `patch-002`, ...).
    #[must_use]
    pub fn positional(index: usize) -> Self {
        Self(format!("patch-{:03}", index.saturating_add(1)))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PatchId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PatchId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Run identifier shaped `YYYYMMDDTHHMMSSZ_XXXXXX`.
///
/// # Invariants
/// - [`RunId::is_well_formed`] is checked by hosts before a run directory is
///   created; the wrapper itself accepts any string so that manifests from
///   older runs still deserialize.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

/// Length of the `YYYYMMDDTHHMMSSZ` prefix.
const RUN_ID_STAMP_LEN: usize = 16;
/// Length of the random suffix.
const RUN_ID_SUFFIX_LEN: usize = 6;

impl RunId {
    /// Creates a new run identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the id matches `YYYYMMDDTHHMMSSZ_` followed by six
    /// ASCII alphanumerics.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let bytes = self.0.as_bytes();
        if bytes.len() != RUN_ID_STAMP_LEN + 1 + RUN_ID_SUFFIX_LEN {
            return false;
        }
        let (stamp, rest) = bytes.split_at(RUN_ID_STAMP_LEN);
        let date_ok = stamp[.. 8].iter().all(u8::is_ascii_digit)
            && stamp[8] == b'T'
            && stamp[9 .. 15].iter().all(u8::is_ascii_digit)
            && stamp[15] == b'Z';
        date_ok && rest[0] == b'_' && rest[1 ..].iter().all(u8::is_ascii_alphanumeric)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RunId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
