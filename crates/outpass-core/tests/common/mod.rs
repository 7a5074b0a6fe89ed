// crates/outpass-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared stores, policies, and students for lifecycle tests.
// Purpose: Provide deterministic fixtures with fixed clocks.
// Dependencies: outpass-core, time
// ============================================================================

//! Shared fixtures: in-memory stores wired into a lifecycle manager and gate
//! verifier, plus a standard hostel outing policy and enrolled students.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

use std::sync::Arc;

use outpass_core::ApprovalTier;
use outpass_core::GateActionMode;
use outpass_core::GatePolicy;
use outpass_core::GateVerifier;
use outpass_core::HolidayBehavior;
use outpass_core::LifecycleConfig;
use outpass_core::LifecycleManager;
use outpass_core::MemoryGateLogStore;
use outpass_core::MemoryPolicyStore;
use outpass_core::MemoryRequestStore;
use outpass_core::MemoryStudentDirectory;
use outpass_core::MemoryTrustLedger;
use outpass_core::PassKind;
use outpass_core::PolicyStore;
use outpass_core::RegNo;
use outpass_core::StudentCategory;
use outpass_core::StudentProfile;
use outpass_core::TimeOfDay;
use outpass_core::TimeWindow;
use outpass_core::Timestamp;
use outpass_core::WeekdayCalendar;
use time::OffsetDateTime;

/// Lifecycle manager type used across the integration tests.
pub type TestManager = LifecycleManager<
    Arc<MemoryRequestStore>,
    Arc<MemoryPolicyStore>,
    Arc<MemoryTrustLedger>,
    Arc<MemoryStudentDirectory>,
    WeekdayCalendar,
>;

/// Gate verifier type used across the integration tests.
pub type TestVerifier = GateVerifier<
    Arc<MemoryRequestStore>,
    Arc<MemoryPolicyStore>,
    Arc<MemoryTrustLedger>,
    Arc<MemoryStudentDirectory>,
    WeekdayCalendar,
    Arc<MemoryGateLogStore>,
>;

/// Store handles retained alongside the manager under test.
pub struct Fixture {
    /// Request store handle.
    pub requests: Arc<MemoryRequestStore>,
    /// Policy store handle.
    pub policies: Arc<MemoryPolicyStore>,
    /// Trust ledger handle.
    pub trust: Arc<MemoryTrustLedger>,
    /// Student directory handle.
    pub directory: Arc<MemoryStudentDirectory>,
    /// Gate log store handle.
    pub logs: Arc<MemoryGateLogStore>,
    /// Verifier wrapping the lifecycle manager under test.
    pub verifier: TestVerifier,
}

impl Fixture {
    /// Returns the lifecycle manager under test.
    pub fn manager(&self) -> &TestManager {
        self.verifier.manager()
    }
}

/// Converts a UTC civil instant to a timestamp.
pub fn at(moment: OffsetDateTime) -> Timestamp {
    Timestamp::from_unix_millis(moment.unix_timestamp() * 1_000)
}

/// Standard hostel outing policy: 08:00-18:00 on working days, holidays
/// blocked, both scans required, 12 hour cap, full approval chain.
pub fn outing_policy() -> GatePolicy {
    GatePolicy {
        category: StudentCategory::Hostel,
        pass_kind: PassKind::new("outing"),
        working_window: Some(
            TimeWindow::new(
                TimeOfDay::new(8, 0).unwrap(),
                TimeOfDay::new(18, 0).unwrap(),
            )
            .unwrap(),
        ),
        holiday_behavior: HolidayBehavior::Block,
        holiday_window: None,
        gate_action: GateActionMode::ScanBoth,
        max_duration_hours: Some(12),
        grace_minutes: 30,
        approval_chain: vec![ApprovalTier::Staff, ApprovalTier::Hod, ApprovalTier::Warden],
    }
}

/// One-way vacation policy: no return scan, warden-only chain, anytime.
pub fn vacation_policy() -> GatePolicy {
    GatePolicy {
        category: StudentCategory::Hostel,
        pass_kind: PassKind::new("vacation"),
        working_window: None,
        holiday_behavior: HolidayBehavior::Allow,
        holiday_window: None,
        gate_action: GateActionMode::ScanExitOnly,
        max_duration_hours: None,
        grace_minutes: 30,
        approval_chain: vec![ApprovalTier::Warden],
    }
}

/// Registration number used by most tests.
pub fn reg_no() -> RegNo {
    RegNo::new("23BCE1001")
}

/// Builds a fixture with the standard policies and one enrolled hostel
/// student.
pub fn fixture() -> Fixture {
    let requests = Arc::new(MemoryRequestStore::new());
    let policies = Arc::new(MemoryPolicyStore::new());
    let trust = Arc::new(MemoryTrustLedger::new());
    let directory = Arc::new(MemoryStudentDirectory::new());
    let logs = Arc::new(MemoryGateLogStore::new());

    policies.put(&outing_policy()).unwrap();
    policies.put(&vacation_policy()).unwrap();
    directory
        .enroll(StudentProfile {
            reg_no: reg_no(),
            name: "Asha Verma".to_string(),
            category: StudentCategory::Hostel,
        })
        .unwrap();

    let manager = LifecycleManager::new(
        Arc::clone(&requests),
        Arc::clone(&policies),
        Arc::clone(&trust),
        Arc::clone(&directory),
        WeekdayCalendar::default(),
        LifecycleConfig::default(),
    );
    Fixture {
        requests,
        policies,
        trust,
        directory,
        logs: Arc::clone(&logs),
        verifier: GateVerifier::new(manager, logs),
    }
}
