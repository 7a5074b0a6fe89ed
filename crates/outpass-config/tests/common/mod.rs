//! Shared helpers for outpass-config tests.
// crates/outpass-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Helpers
// Description: Minimal validated config construction for validation tests.
// Purpose: Keep per-test setup to a single call.
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use outpass_config::ConfigError;
use outpass_config::OutpassConfig;

/// Returns the built-in default config after passing validation.
pub fn minimal_config() -> Result<OutpassConfig, ConfigError> {
    let config = OutpassConfig::default();
    config.validate()?;
    Ok(config)
}
