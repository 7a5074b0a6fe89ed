// crates/outpass-config/src/lib.rs
// ============================================================================
// Module: Outpass Config Library
// Description: TOML configuration model with strict fail-closed validation.
// Purpose: Load, validate, and expose runtime settings for server and
//          terminal binaries.
// Dependencies: outpass-core, outpass-store-sqlite, serde, thiserror, time,
//               toml, url
// ============================================================================

//! ## Overview
//! One TOML file configures every Outpass binary. Loading is strict: path
//! and size limits are enforced before parsing, the file must be UTF-8,
//! unknown sections are rejected, and `validate` fails closed on any
//! inconsistent setting. A config that loads is a config the binaries can
//! run with.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::BackoffConfig;
pub use config::CalendarConfig;
pub use config::ConfigError;
pub use config::OutpassConfig;
pub use config::ServerConfig;
pub use config::StoreConfig;
pub use config::StoreType;
pub use config::SweepConfig;
pub use config::TerminalConfig;
pub use config::MAX_CONFIG_BYTES;
pub use config::OUTPASS_CONFIG_ENV;
