// crates/revision-gate-config/src/lib.rs
// ============================================================================
// Module: Revision Gate Config Library
// Description: Run configuration and evidence input loaders.
// Purpose: Single source of truth for revision-gate.toml and its inputs.
// Dependencies: revision-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `revision-gate-config` loads the run configuration, the source registry
//! snapshot, and the per-question gate declarations. Every loader enforces
//! path, size, and encoding limits and fails closed on anything it does not
//! understand.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod gate;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use gate::load_gate_config;
pub use gate::parse_gate_config;
pub use registry::RegistryFormat;
pub use registry::load_source_registry;
pub use registry::parse_source_registry;
