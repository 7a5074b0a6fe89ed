// crates/outpass-terminal/src/lib.rs
// ============================================================================
// Module: Outpass Gate Terminal Library
// Description: Gate terminal client with offline cache and sync queue.
// Purpose: Keep physical gates operational through server outages.
// Dependencies: outpass-config, outpass-core, reqwest, serde, serde_json,
//               thiserror, url
// ============================================================================

//! ## Overview
//! The terminal talks to the Outpass server for every scan when it can,
//! and degrades to a cached snapshot and a durable action queue when it
//! cannot. Offline answers are always marked stale and never grant more
//! than the server already approved; queued actions replay FIFO with
//! bounded backoff once connectivity returns.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod client;
pub mod queue;
mod storage;
pub mod sync;
pub mod terminal;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::SnapshotCache;
pub use client::ClientError;
pub use client::ServerClient;
pub use queue::OfflineQueue;
pub use queue::QueuedAction;
pub use storage::PersistError;
pub use sync::ActionPoster;
pub use sync::Backoff;
pub use sync::DrainReport;
pub use sync::drain;
pub use terminal::GateApi;
pub use terminal::GateTerminal;
pub use terminal::TerminalError;
pub use terminal::TerminalLogOutcome;
pub use terminal::wall_clock;
