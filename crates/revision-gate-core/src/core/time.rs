// crates/revision-gate-core/src/core/time.rs
// ============================================================================
// Module: Revision Gate Time Model
// Description: Explicit timestamps carried by run contexts and manifests.
// Purpose: Keep revision dates reproducible by never reading the wall clock.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A revision run receives its timestamp from the host. The same timestamp is
//! stamped onto every tracked change the run produces and onto the runpack
//! manifest, so re-running with the same inputs and timestamp reproduces the
//! same bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Timestamp supplied by the host for a run.
///
/// # Invariants
/// - The core never reads wall-clock time; callers provide every value.
/// - `Logical` values render as that many seconds after the Unix epoch so
///   tests can use small, readable numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Renders the timestamp as an RFC 3339 UTC string with whole seconds
    /// (`2026-02-12T12:00:00Z`), the form word processors expect on
    /// revision marks.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError`] when the value is outside the representable range.
    pub fn to_rfc3339(&self) -> Result<String, TimeError> {
        let seconds = match self {
            Self::UnixMillis(millis) => millis.div_euclid(1000),
            Self::Logical(value) => {
                i64::try_from(*value).map_err(|_| TimeError::OutOfRange(value.to_string()))?
            }
        };
        let instant = OffsetDateTime::from_unix_timestamp(seconds)
            .map_err(|err| TimeError::OutOfRange(err.to_string()))?;
        instant.format(&Rfc3339).map_err(|err| TimeError::Format(err.to_string()))
    }

    /// Parses an RFC 3339 string into a millisecond timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Parse`] when the input is not RFC 3339.
    pub fn parse_rfc3339(value: &str) -> Result<Self, TimeError> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339)
            .map_err(|err| TimeError::Parse(err.to_string()))?;
        let millis = parsed.unix_timestamp_nanos() / 1_000_000;
        let millis = i64::try_from(millis).map_err(|_| TimeError::OutOfRange(value.to_string()))?;
        Ok(Self::UnixMillis(millis))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp conversion errors.
#[derive(Debug, Error)]
pub enum TimeError {
    /// Value cannot be represented as a calendar date.
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
    /// Calendar formatting failed.
    #[error("timestamp format error: {0}")]
    Format(String),
    /// Input string is not RFC 3339.
    #[error("timestamp parse error: {0}")]
    Parse(String),
}
