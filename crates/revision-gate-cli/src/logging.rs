// crates/revision-gate-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Installs the process-wide tracing subscriber.
// Purpose: Route structured run events to stderr, filtered by environment.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! Log output always goes to stderr so stdout stays machine-readable. The
//! filter comes from `REVISION_GATE_LOG` (standard `EnvFilter` directives)
//! and falls back to `info`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter.
pub const LOG_ENV_VAR: &str = "REVISION_GATE_LOG";
/// Filter used when the environment sets none.
pub const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: Initialization
// ============================================================================

/// Builds the filter from an optional directive string.
///
/// Blank or unparseable directives fall back to [`DEFAULT_LOG_FILTER`].
#[must_use]
pub fn resolve_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the stderr subscriber.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging() -> bool {
    let directives = std::env::var(LOG_ENV_VAR).ok();
    tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::DEFAULT_LOG_FILTER;
    use super::resolve_filter;

    #[test]
    fn blank_directives_fall_back_to_default() {
        assert_eq!(resolve_filter(None).to_string(), DEFAULT_LOG_FILTER);
        assert_eq!(resolve_filter(Some("  ")).to_string(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn explicit_directives_are_used() {
        let filter = resolve_filter(Some("revision_gate_core=debug"));
        assert_eq!(filter.to_string(), "revision_gate_core=debug");
    }
}
