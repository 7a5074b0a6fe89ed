// crates/outpass-server/src/lib.rs
// ============================================================================
// Module: Outpass Server Library
// Description: HTTP surface and sweep worker over the decision engine.
// Purpose: Serve students, approvers, gate terminals, and administrators.
// Dependencies: outpass-config, outpass-core, outpass-store-sqlite, axum,
//               serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! The server exposes the pass lifecycle, gate verification, the terminal
//! sync snapshot, and policy administration over HTTP. Handlers never hold
//! business rules: every decision flows through `outpass-core`, the server
//! only maps identities, payloads, statuses, and audit events.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod api;
pub mod audit;
pub mod server;
pub mod state;
pub mod sweep;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use api::ApiError;
pub use api::router;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::GateAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::RequestAuditEvent;
pub use audit::StderrAuditSink;
pub use audit::SweepAuditEvent;
pub use audit::build_sink;
pub use server::OutpassServer;
pub use server::ServerError;
pub use state::AppState;
pub use state::RequestLimits;
pub use state::StudentEnroller;
pub use state::run_blocking;
pub use state::wall_clock;
pub use sweep::sweep_once;
