// crates/outpass-core/src/core/gate.rs
// ============================================================================
// Module: Outpass Gate Records
// Description: Gate scan logs, scan outcome taxonomy, and cache snapshots.
// Purpose: Capture immutable scan history and the terminal read-model export.
// Dependencies: crate::core::{identifiers, request, time}, serde
// ============================================================================

//! ## Overview
//! Every physical scan outcome is recorded as an immutable gate log row.
//! The cache snapshot is a point-in-time export of all students holding a
//! non-terminal pass; gate terminals refresh it periodically and consult it
//! only when the server is unreachable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::PassKind;
use crate::core::identifiers::RegNo;
use crate::core::identifiers::RequestId;
use crate::core::request::PassStatus;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Gate Actions
// ============================================================================

/// Physical gate action performed on a pass.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    /// Student exits campus.
    Exit,
    /// Student re-enters campus.
    Entry,
}

impl GateAction {
    /// Returns the stable string form used by stores and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Entry => "entry",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "exit" => Some(Self::Exit),
            "entry" => Some(Self::Entry),
            _ => None,
        }
    }
}

/// Provenance of a gate log row.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    /// Recorded live against the server.
    Online,
    /// Captured offline at a terminal and synced later.
    OfflineSynced,
}

impl LogSource {
    /// Returns the stable string form used by stores and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::OfflineSynced => "offline_synced",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "online" => Some(Self::Online),
            "offline_synced" => Some(Self::OfflineSynced),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Gate Logs
// ============================================================================

/// Immutable record of one physical scan outcome.
///
/// # Invariants
/// - Rows are append-only; replays of the same `(request_id, action)` pair
///   must not create duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateLog {
    /// Request the scan applied to.
    pub request_id: RequestId,
    /// Student who was scanned.
    pub student_id: RegNo,
    /// Action performed.
    pub action: GateAction,
    /// Gatekeeper who performed the scan.
    pub gatekeeper_id: ActorId,
    /// Time the scan was recorded.
    pub recorded_at: Timestamp,
    /// Optional gatekeeper comments.
    pub comments: Option<String>,
    /// Provenance of the row.
    pub source: LogSource,
}

// ============================================================================
// SECTION: Scan Outcome Taxonomy
// ============================================================================

/// Status returned to a gate terminal for a scanned identity.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// Pass is ready for the next expected action.
    Valid,
    /// Student has exited and is awaiting return.
    Out,
    /// Exit attempted before the departure window (minus grace).
    Early,
    /// Past the planned return without a return scan.
    Overdue,
    /// Pass window elapsed unused.
    Expired,
    /// No qualifying pass, or policy blocks the requested direction.
    Invalid,
}

// ============================================================================
// SECTION: Cache Snapshot
// ============================================================================

/// Compact pass projection carried in verification results and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    /// Request identifier.
    pub id: RequestId,
    /// Current lifecycle status.
    pub status: PassStatus,
    /// Pass kind.
    pub pass_kind: PassKind,
    /// Planned departure time.
    pub departure_at: Timestamp,
    /// Planned return time; `None` for one-way passes.
    pub return_at: Option<Timestamp>,
    /// Last recorded gate action, if any.
    pub last_action: Option<GateAction>,
}

/// One student's entry in the terminal cache snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Student registration number.
    pub reg_no: RegNo,
    /// Student display name.
    pub name: String,
    /// Derived trust score at snapshot time.
    pub trust_score: i64,
    /// The student's current non-terminal pass.
    pub pass: PassSummary,
}

/// Point-in-time export of all students with a non-terminal pass.
///
/// # Invariants
/// - Each refresh fully replaces the prior snapshot on the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Time the snapshot was generated.
    pub generated_at: Timestamp,
    /// Snapshot records, one per student with a non-terminal pass.
    pub records: Vec<SnapshotRecord>,
}

impl CacheSnapshot {
    /// Finds the record for a registration number, if present.
    #[must_use]
    pub fn find(&self, reg_no: &RegNo) -> Option<&SnapshotRecord> {
        self.records.iter().find(|record| record.reg_no == *reg_no)
    }
}
