// crates/outpass-core/src/interfaces/mod.rs
// ============================================================================
// Module: Outpass Interfaces
// Description: Backend-agnostic interfaces for storage, students, and calendars.
// Purpose: Define the contract surfaces used by the Outpass runtime.
// Dependencies: crate::core, serde, thiserror, time
// ============================================================================

//! ## Overview
//! Interfaces define how the Outpass runtime integrates with persistence and
//! institutional data without embedding backend-specific details.
//! Implementations must fail closed: a store that cannot answer reliably
//! returns an error rather than a guess.
//!
//! The request store's conditional `update_status` is the concurrency
//! primitive for the whole subsystem: every lifecycle transition is a
//! compare-and-swap keyed on the expected current status, so concurrent
//! scans, approvals, and expiry sweeps cannot corrupt the state machine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Date;

use crate::core::ApprovalEvent;
use crate::core::DayKind;
use crate::core::GateAction;
use crate::core::GateLog;
use crate::core::GatePolicy;
use crate::core::NewPassRequest;
use crate::core::PassRequest;
use crate::core::PassStatus;
use crate::core::PolicyId;
use crate::core::RegNo;
use crate::core::RequestId;
use crate::core::StudentCategory;
use crate::core::Timestamp;
use crate::core::TrustEvent;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage errors shared by all store interfaces.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Uniqueness or conditional-write conflict.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// Store reported an error.
    #[error("store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Student Directory
// ============================================================================

/// Institutional student record consulted at submission and verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Registration number.
    pub reg_no: RegNo,
    /// Display name.
    pub name: String,
    /// Residency category.
    pub category: StudentCategory,
}

/// Read-only directory of enrolled students.
pub trait StudentDirectory {
    /// Looks up a student by registration number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory cannot be read.
    fn lookup(&self, reg_no: &RegNo) -> Result<Option<StudentProfile>, StoreError>;
}

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// Admin-mutated store of gate policies.
pub trait PolicyStore {
    /// Loads a policy by identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn get(&self, id: &PolicyId) -> Result<Option<GatePolicy>, StoreError>;

    /// Inserts or replaces a policy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn put(&self, policy: &GatePolicy) -> Result<(), StoreError>;

    /// Lists all policies.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn list(&self) -> Result<Vec<GatePolicy>, StoreError>;

    /// Removes a policy, reporting whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn remove(&self, id: &PolicyId) -> Result<bool, StoreError>;
}

// ============================================================================
// SECTION: Request Store
// ============================================================================

/// Store of pass requests and their append-only approval events.
pub trait RequestStore {
    /// Creates a new pending request, assigning its identifier.
    ///
    /// The single-active-pass invariant is enforced here as a conditional
    /// write: creation fails with [`StoreError::Conflict`] when the student
    /// already holds a non-terminal request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a duplicate active pass, or
    /// another [`StoreError`] when the write fails.
    fn create(&self, new: &NewPassRequest) -> Result<PassRequest, StoreError>;

    /// Loads a request by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn load(&self, id: RequestId) -> Result<Option<PassRequest>, StoreError>;

    /// Finds the student's current non-terminal request, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn find_active(&self, student: &RegNo) -> Result<Option<PassRequest>, StoreError>;

    /// Conditionally advances a request's status.
    ///
    /// The update applies only when the stored status equals `expected`;
    /// returns `false` when the guard fails (the caller lost a race).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn update_status(
        &self,
        id: RequestId,
        expected: PassStatus,
        next: PassStatus,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Conditionally edits a pending request's details.
    ///
    /// The update applies only while the request is still
    /// [`PassStatus::Pending`]; returns `false` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn update_details(
        &self,
        id: RequestId,
        reason: &str,
        departure_at: Timestamp,
        return_at: Option<Timestamp>,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Appends an approval timeline event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn append_event(&self, event: &ApprovalEvent) -> Result<(), StoreError>;

    /// Lists the approval timeline for a request, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn events(&self, id: RequestId) -> Result<Vec<ApprovalEvent>, StoreError>;

    /// Lists a student's requests, newest first, with offset pagination.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn list_by_student(
        &self,
        student: &RegNo,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PassRequest>, StoreError>;

    /// Lists every non-terminal request (snapshot export, expiry sweep).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn list_non_terminal(&self) -> Result<Vec<PassRequest>, StoreError>;
}

// ============================================================================
// SECTION: Trust Ledger
// ============================================================================

/// Append-only ledger of trust score deltas.
pub trait TrustLedger {
    /// Appends a trust event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn append(&self, event: &TrustEvent) -> Result<(), StoreError>;

    /// Lists all events for a student, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn events_for(&self, student: &RegNo) -> Result<Vec<TrustEvent>, StoreError>;
}

// ============================================================================
// SECTION: Gate Log Store
// ============================================================================

/// Append-only store of physical scan outcomes.
pub trait GateLogStore {
    /// Appends a gate log row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn append(&self, log: &GateLog) -> Result<(), StoreError>;

    /// Reports whether a row exists for the `(request, action)` pair.
    ///
    /// Used for idempotent replay detection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn exists(&self, request_id: RequestId, action: GateAction) -> Result<bool, StoreError>;

    /// Lists log rows for a request, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn list_for(&self, request_id: RequestId) -> Result<Vec<GateLog>, StoreError>;
}

// ============================================================================
// SECTION: Holiday Calendar
// ============================================================================

/// External institutional calendar collaborator.
pub trait HolidayCalendar {
    /// Classifies a civil date as working or holiday.
    fn day_kind(&self, date: Date) -> DayKind;
}
