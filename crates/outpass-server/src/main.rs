// crates/outpass-server/src/main.rs
// ============================================================================
// Module: Outpass Server Binary
// Description: Entry point loading config and serving HTTP.
// Purpose: Run the Outpass server with an optional config path argument.
// Dependencies: outpass-config, outpass-server, tokio
// ============================================================================

//! ## Overview
//! Usage: `outpass-server [config-path]`. Without an argument the config is
//! resolved through the `OUTPASS_CONFIG` environment variable, then
//! `outpass.toml` in the working directory, then built-in defaults.

use std::path::PathBuf;

use outpass_config::OutpassConfig;
use outpass_server::OutpassServer;
use outpass_server::ServerError;

/// Loads configuration and serves until the listener fails.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = OutpassConfig::load(path.as_deref())
        .map_err(|err| ServerError::Config(err.to_string()))?;
    let server = OutpassServer::from_config(config)?;
    server.serve().await
}
