// crates/revision-gate-cli/src/run_id.rs
// ============================================================================
// Module: Run Id Minting
// Description: Creates and validates `YYYYMMDDTHHMMSSZ_XXXXXX` run ids.
// Purpose: Give every run a sortable, collision-resistant directory name.
// Dependencies: rand, revision-gate-core
// ============================================================================

//! ## Overview
//! The stamp is the run timestamp in UTC; the suffix is six uppercase
//! alphanumerics. User-supplied ids are checked against the same shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;
use rand::rngs::OsRng;
use revision_gate_core::RunId;
use revision_gate_core::Timestamp;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters drawn for the random suffix.
const SUFFIX_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Length of the random suffix.
const SUFFIX_LEN: usize = 6;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Run id errors.
#[derive(Debug, Error)]
pub enum RunIdError {
    /// Timestamp cannot be rendered as a four-digit-year UTC stamp.
    #[error("run timestamp cannot be used in a run id: {0}")]
    Timestamp(String),
    /// User-supplied id has the wrong shape.
    #[error("run id `{0}` must match YYYYMMDDTHHMMSSZ_XXXXXX")]
    Malformed(String),
}

// ============================================================================
// SECTION: Minting
// ============================================================================

/// Mints a run id for a timestamp using the operating system RNG.
///
/// # Errors
///
/// Returns [`RunIdError::Timestamp`] when the timestamp is out of range.
pub fn mint_run_id(timestamp: Timestamp) -> Result<RunId, RunIdError> {
    mint_run_id_with(timestamp, &mut OsRng)
}

/// Mints a run id with a caller-supplied RNG.
///
/// # Errors
///
/// Returns [`RunIdError::Timestamp`] when the timestamp is out of range.
pub fn mint_run_id_with<R: Rng>(timestamp: Timestamp, rng: &mut R) -> Result<RunId, RunIdError> {
    let stamp = utc_stamp(timestamp)?;
    let suffix: String = (0 .. SUFFIX_LEN)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.gen_range(0 .. SUFFIX_ALPHABET.len())]))
        .collect();
    Ok(RunId::new(format!("{stamp}_{suffix}")))
}

/// Validates a user-supplied run id.
///
/// # Errors
///
/// Returns [`RunIdError::Malformed`] when the id has the wrong shape.
pub fn parse_run_id(value: &str) -> Result<RunId, RunIdError> {
    let run_id = RunId::new(value.trim());
    if run_id.is_well_formed() {
        Ok(run_id)
    } else {
        Err(RunIdError::Malformed(value.to_string()))
    }
}

/// Renders `YYYYMMDDTHHMMSSZ` for a timestamp.
fn utc_stamp(timestamp: Timestamp) -> Result<String, RunIdError> {
    let seconds = match timestamp {
        Timestamp::UnixMillis(millis) => millis.div_euclid(1000),
        Timestamp::Logical(value) => {
            i64::try_from(value).map_err(|_| RunIdError::Timestamp(value.to_string()))?
        }
    };
    let instant = OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|err| RunIdError::Timestamp(err.to_string()))?;
    if !(0 ..= 9999).contains(&instant.year()) {
        let year = instant.year();
        return Err(RunIdError::Timestamp(format!("year {year} has more than four digits")));
    }
    Ok(format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        instant.year(),
        u8::from(instant.month()),
        instant.day(),
        instant.hour(),
        instant.minute(),
        instant.second()
    ))
}
