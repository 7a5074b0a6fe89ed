// crates/outpass-server/src/server.rs
// ============================================================================
// Module: Outpass HTTP Server
// Description: Server assembly from configuration through serving.
// Purpose: Wire stores, audit, router, and the sweep worker into one
//          process.
// Dependencies: outpass-config, outpass-core, outpass-store-sqlite, axum,
//               tokio
// ============================================================================

//! ## Overview
//! `OutpassServer::from_config` validates configuration, opens the selected
//! store backend, and builds the shared state; `serve` binds the listener,
//! spawns the expiry sweeper, and runs axum until the listener fails. All
//! failure paths surface as [`ServerError`] with the failing subsystem
//! named.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use outpass_config::OutpassConfig;
use outpass_config::StoreType;
use outpass_core::LifecycleConfig;
use outpass_store_sqlite::SqliteStore;

use crate::api;
use crate::audit::build_sink;
use crate::state::AppState;
use crate::state::RequestLimits;
use crate::sweep;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server assembly and serving errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Outpass HTTP server instance.
pub struct OutpassServer {
    /// Validated configuration.
    config: OutpassConfig,
    /// Shared application state.
    state: AppState,
}

impl OutpassServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation or store initialization
    /// fails.
    pub fn from_config(config: OutpassConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let state = build_state(&config)?;
        Ok(Self {
            config,
            state,
        })
    }

    /// Returns the shared application state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serves requests until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .config
            .server
            .bind
            .parse()
            .map_err(|_| ServerError::Config("invalid bind address".to_string()))?;
        let sweeper = sweep::spawn(self.state.clone(), self.config.sweep.interval_secs);
        let app = api::router(self.state);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        let served = axum::serve(listener, app).await;
        sweeper.abort();
        served.map_err(|_| ServerError::Transport("http server failed".to_string()))
    }
}

/// Builds shared state over the configured store backend.
fn build_state(config: &OutpassConfig) -> Result<AppState, ServerError> {
    let audit = build_sink(&config.audit).map_err(|err| ServerError::Init(err.to_string()))?;
    let calendar =
        config.calendar.build().map_err(|err| ServerError::Config(err.to_string()))?;
    let lifecycle = LifecycleConfig {
        trust: config.trust,
        cooldown: config.cooldown,
    };
    let limits = RequestLimits::from(&config.server);
    let state = match config.store.store_type {
        StoreType::Memory => AppState::in_memory(lifecycle, calendar, audit, limits),
        StoreType::Sqlite => {
            let sqlite_config = config.store.sqlite().ok_or_else(|| {
                ServerError::Config("store.path required for the sqlite store".to_string())
            })?;
            let store = SqliteStore::open(&sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            AppState::with_sqlite(Arc::new(store), lifecycle, calendar, audit, limits)
        }
    };
    Ok(state)
}
