// crates/outpass-core/src/runtime/store.rs
// ============================================================================
// Module: Outpass In-Memory Stores
// Description: Mutex-guarded in-memory store implementations and shared handles.
// Purpose: Back small deployments and deterministic tests without a database.
// Dependencies: crate::{core, interfaces}, std, time
// ============================================================================

//! ## Overview
//! In-memory implementations of every store interface, each a `Mutex` around
//! ordered maps. They honor the same contracts as durable backends: request
//! creation enforces the single-active-pass invariant, status updates are
//! conditional writes, and event stores are append-only. The weekday calendar
//! classifies days from a weekly-off set plus explicit holiday dates.
//!
//! Shared handles (`Arc<T>` over any store) let one backend serve several
//! runtime components at once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use time::Date;
use time::Weekday;

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
use crate::core::Timestamp;
use crate::core::TrustEvent;
use crate::interfaces::GateLogStore;
use crate::interfaces::HolidayCalendar;
use crate::interfaces::PolicyStore;
use crate::interfaces::RequestStore;
use crate::interfaces::StoreError;
use crate::interfaces::StudentDirectory;
use crate::interfaces::StudentProfile;
use crate::interfaces::TrustLedger;

// ============================================================================
// SECTION: Lock Helper
// ============================================================================

/// Acquires a store lock, mapping poisoning to a store error.
fn locked<'guard, T>(
    mutex: &'guard Mutex<T>,
    what: &str,
) -> Result<MutexGuard<'guard, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Store(format!("{what} lock poisoned")))
}

// ============================================================================
// SECTION: Student Directory
// ============================================================================

/// In-memory student directory.
#[derive(Debug, Default)]
pub struct MemoryStudentDirectory {
    /// Enrolled students keyed by registration number.
    students: Mutex<BTreeMap<RegNo, StudentProfile>>,
}

impl MemoryStudentDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrolls or replaces a student record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory lock is poisoned.
    pub fn enroll(&self, profile: StudentProfile) -> Result<(), StoreError> {
        let mut students = locked(&self.students, "student directory")?;
        students.insert(profile.reg_no.clone(), profile);
        Ok(())
    }
}

impl StudentDirectory for MemoryStudentDirectory {
    fn lookup(&self, reg_no: &RegNo) -> Result<Option<StudentProfile>, StoreError> {
        let students = locked(&self.students, "student directory")?;
        Ok(students.get(reg_no).cloned())
    }
}

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// In-memory policy store.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    /// Policies keyed by (category, pass kind) identity.
    policies: Mutex<BTreeMap<PolicyId, GatePolicy>>,
}

impl MemoryPolicyStore {
    /// Creates an empty policy store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn get(&self, id: &PolicyId) -> Result<Option<GatePolicy>, StoreError> {
        let policies = locked(&self.policies, "policy store")?;
        Ok(policies.get(id).cloned())
    }

    fn put(&self, policy: &GatePolicy) -> Result<(), StoreError> {
        let id = PolicyId::new(policy.category, policy.pass_kind.clone());
        let mut policies = locked(&self.policies, "policy store")?;
        policies.insert(id, policy.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<GatePolicy>, StoreError> {
        let policies = locked(&self.policies, "policy store")?;
        Ok(policies.values().cloned().collect())
    }

    fn remove(&self, id: &PolicyId) -> Result<bool, StoreError> {
        let mut policies = locked(&self.policies, "policy store")?;
        Ok(policies.remove(id).is_some())
    }
}

// ============================================================================
// SECTION: Request Store
// ============================================================================

/// Mutable state behind the request store lock.
#[derive(Debug, Default)]
struct RequestRows {
    /// Next identifier to assign.
    next_id: i64,
    /// Requests keyed by identifier.
    requests: BTreeMap<i64, PassRequest>,
    /// Approval events in append order.
    events: Vec<ApprovalEvent>,
}

/// In-memory pass request store.
#[derive(Debug, Default)]
pub struct MemoryRequestStore {
    /// Guarded rows.
    rows: Mutex<RequestRows>,
}

impl MemoryRequestStore {
    /// Creates an empty request store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestStore for MemoryRequestStore {
    fn create(&self, new: &NewPassRequest) -> Result<PassRequest, StoreError> {
        let mut rows = locked(&self.rows, "request store")?;
        let duplicate = rows
            .requests
            .values()
            .any(|req| req.student_id == new.student_id && !req.status.is_terminal());
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "student {} already holds a non-terminal request",
                new.student_id
            )));
        }
        rows.next_id += 1;
        let request = PassRequest {
            id: RequestId::new(rows.next_id),
            student_id: new.student_id.clone(),
            category: new.category,
            pass_kind: new.pass_kind.clone(),
            reason: new.reason.clone(),
            departure_at: new.departure_at,
            return_at: new.return_at,
            status: PassStatus::Pending,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        rows.requests.insert(request.id.value(), request.clone());
        Ok(request)
    }

    fn load(&self, id: RequestId) -> Result<Option<PassRequest>, StoreError> {
        let rows = locked(&self.rows, "request store")?;
        Ok(rows.requests.get(&id.value()).cloned())
    }

    fn find_active(&self, student: &RegNo) -> Result<Option<PassRequest>, StoreError> {
        let rows = locked(&self.rows, "request store")?;
        Ok(rows
            .requests
            .values()
            .find(|req| req.student_id == *student && !req.status.is_terminal())
            .cloned())
    }

    fn update_status(
        &self,
        id: RequestId,
        expected: PassStatus,
        next: PassStatus,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut rows = locked(&self.rows, "request store")?;
        match rows.requests.get_mut(&id.value()) {
            Some(req) if req.status == expected => {
                req.status = next;
                req.updated_at = updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn update_details(
        &self,
        id: RequestId,
        reason: &str,
        departure_at: Timestamp,
        return_at: Option<Timestamp>,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut rows = locked(&self.rows, "request store")?;
        match rows.requests.get_mut(&id.value()) {
            Some(req) if req.status == PassStatus::Pending => {
                req.reason = reason.to_string();
                req.departure_at = departure_at;
                req.return_at = return_at;
                req.updated_at = updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn append_event(&self, event: &ApprovalEvent) -> Result<(), StoreError> {
        let mut rows = locked(&self.rows, "request store")?;
        rows.events.push(event.clone());
        Ok(())
    }

    fn events(&self, id: RequestId) -> Result<Vec<ApprovalEvent>, StoreError> {
        let rows = locked(&self.rows, "request store")?;
        Ok(rows.events.iter().filter(|event| event.request_id == id).cloned().collect())
    }

    fn list_by_student(
        &self,
        student: &RegNo,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PassRequest>, StoreError> {
        let rows = locked(&self.rows, "request store")?;
        let mut mine: Vec<PassRequest> = rows
            .requests
            .values()
            .filter(|req| req.student_id == *student)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.value().cmp(&a.id.value())));
        Ok(mine.into_iter().skip(offset).take(limit).collect())
    }

    fn list_non_terminal(&self) -> Result<Vec<PassRequest>, StoreError> {
        let rows = locked(&self.rows, "request store")?;
        Ok(rows.requests.values().filter(|req| !req.status.is_terminal()).cloned().collect())
    }
}

// ============================================================================
// SECTION: Trust Ledger
// ============================================================================

/// In-memory append-only trust ledger.
#[derive(Debug, Default)]
pub struct MemoryTrustLedger {
    /// Events in append order.
    events: Mutex<Vec<TrustEvent>>,
}

impl MemoryTrustLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrustLedger for MemoryTrustLedger {
    fn append(&self, event: &TrustEvent) -> Result<(), StoreError> {
        let mut events = locked(&self.events, "trust ledger")?;
        events.push(event.clone());
        Ok(())
    }

    fn events_for(&self, student: &RegNo) -> Result<Vec<TrustEvent>, StoreError> {
        let events = locked(&self.events, "trust ledger")?;
        Ok(events.iter().filter(|event| event.student_id == *student).cloned().collect())
    }
}

// ============================================================================
// SECTION: Gate Log Store
// ============================================================================

/// In-memory append-only gate log store.
#[derive(Debug, Default)]
pub struct MemoryGateLogStore {
    /// Log rows in append order.
    logs: Mutex<Vec<GateLog>>,
}

impl MemoryGateLogStore {
    /// Creates an empty log store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl GateLogStore for MemoryGateLogStore {
    fn append(&self, log: &GateLog) -> Result<(), StoreError> {
        let mut logs = locked(&self.logs, "gate log store")?;
        logs.push(log.clone());
        Ok(())
    }

    fn exists(&self, request_id: RequestId, action: GateAction) -> Result<bool, StoreError> {
        let logs = locked(&self.logs, "gate log store")?;
        Ok(logs.iter().any(|log| log.request_id == request_id && log.action == action))
    }

    fn list_for(&self, request_id: RequestId) -> Result<Vec<GateLog>, StoreError> {
        let logs = locked(&self.logs, "gate log store")?;
        Ok(logs.iter().filter(|log| log.request_id == request_id).cloned().collect())
    }
}

// ============================================================================
// SECTION: Weekday Calendar
// ============================================================================

/// Calendar classifying days from weekly offs plus explicit holiday dates.
#[derive(Debug, Clone)]
pub struct WeekdayCalendar {
    /// Weekdays treated as holidays every week.
    weekly_off: HashSet<Weekday>,
    /// Explicit holiday dates.
    holidays: BTreeSet<Date>,
}

impl WeekdayCalendar {
    /// Creates a calendar with the given weekly offs and holiday dates.
    #[must_use]
    pub const fn new(weekly_off: HashSet<Weekday>, holidays: BTreeSet<Date>) -> Self {
        Self {
            weekly_off,
            holidays,
        }
    }

    /// Adds an explicit holiday date.
    pub fn add_holiday(&mut self, date: Date) {
        self.holidays.insert(date);
    }
}

impl Default for WeekdayCalendar {
    /// Sundays off, no explicit holidays.
    fn default() -> Self {
        let mut weekly_off = HashSet::new();
        weekly_off.insert(Weekday::Sunday);
        Self::new(weekly_off, BTreeSet::new())
    }
}

impl HolidayCalendar for WeekdayCalendar {
    fn day_kind(&self, date: Date) -> DayKind {
        if self.weekly_off.contains(&date.weekday()) || self.holidays.contains(&date) {
            DayKind::Holiday
        } else {
            DayKind::Working
        }
    }
}

// ============================================================================
// SECTION: Shared Handles
// ============================================================================

impl<T: StudentDirectory + ?Sized> StudentDirectory for Arc<T> {
    fn lookup(&self, reg_no: &RegNo) -> Result<Option<StudentProfile>, StoreError> {
        self.as_ref().lookup(reg_no)
    }
}

impl<T: PolicyStore + ?Sized> PolicyStore for Arc<T> {
    fn get(&self, id: &PolicyId) -> Result<Option<GatePolicy>, StoreError> {
        self.as_ref().get(id)
    }

    fn put(&self, policy: &GatePolicy) -> Result<(), StoreError> {
        self.as_ref().put(policy)
    }

    fn list(&self) -> Result<Vec<GatePolicy>, StoreError> {
        self.as_ref().list()
    }

    fn remove(&self, id: &PolicyId) -> Result<bool, StoreError> {
        self.as_ref().remove(id)
    }
}

impl<T: RequestStore + ?Sized> RequestStore for Arc<T> {
    fn create(&self, new: &NewPassRequest) -> Result<PassRequest, StoreError> {
        self.as_ref().create(new)
    }

    fn load(&self, id: RequestId) -> Result<Option<PassRequest>, StoreError> {
        self.as_ref().load(id)
    }

    fn find_active(&self, student: &RegNo) -> Result<Option<PassRequest>, StoreError> {
        self.as_ref().find_active(student)
    }

    fn update_status(
        &self,
        id: RequestId,
        expected: PassStatus,
        next: PassStatus,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError> {
        self.as_ref().update_status(id, expected, next, updated_at)
    }

    fn update_details(
        &self,
        id: RequestId,
        reason: &str,
        departure_at: Timestamp,
        return_at: Option<Timestamp>,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError> {
        self.as_ref().update_details(id, reason, departure_at, return_at, updated_at)
    }

    fn append_event(&self, event: &ApprovalEvent) -> Result<(), StoreError> {
        self.as_ref().append_event(event)
    }

    fn events(&self, id: RequestId) -> Result<Vec<ApprovalEvent>, StoreError> {
        self.as_ref().events(id)
    }

    fn list_by_student(
        &self,
        student: &RegNo,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PassRequest>, StoreError> {
        self.as_ref().list_by_student(student, offset, limit)
    }

    fn list_non_terminal(&self) -> Result<Vec<PassRequest>, StoreError> {
        self.as_ref().list_non_terminal()
    }
}

impl<T: TrustLedger + ?Sized> TrustLedger for Arc<T> {
    fn append(&self, event: &TrustEvent) -> Result<(), StoreError> {
        self.as_ref().append(event)
    }

    fn events_for(&self, student: &RegNo) -> Result<Vec<TrustEvent>, StoreError> {
        self.as_ref().events_for(student)
    }
}

impl<T: GateLogStore + ?Sized> GateLogStore for Arc<T> {
    fn append(&self, log: &GateLog) -> Result<(), StoreError> {
        self.as_ref().append(log)
    }

    fn exists(&self, request_id: RequestId, action: GateAction) -> Result<bool, StoreError> {
        self.as_ref().exists(request_id, action)
    }

    fn list_for(&self, request_id: RequestId) -> Result<Vec<GateLog>, StoreError> {
        self.as_ref().list_for(request_id)
    }
}

impl<T: HolidayCalendar + ?Sized> HolidayCalendar for Arc<T> {
    fn day_kind(&self, date: Date) -> DayKind {
        self.as_ref().day_kind(date)
    }
}
