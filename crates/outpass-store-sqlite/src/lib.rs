// crates/outpass-store-sqlite/src/lib.rs
// ============================================================================
// Module: Outpass SQLite Store Library
// Description: Durable Outpass store backends backed by SQLite WAL.
// Purpose: Persist students, policies, requests, and ledgers durably.
// Dependencies: outpass-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! One `SQLite` database implements every Outpass store interface. The
//! single-active-pass invariant and scan idempotence are enforced by the
//! schema itself (partial unique indexes), and every lifecycle transition is
//! a conditional `UPDATE` guarded by the expected current status, so the
//! guarantees hold across processes sharing the file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
