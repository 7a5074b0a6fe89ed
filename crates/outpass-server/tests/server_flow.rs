//! End-to-end flow tests over the shared server state.
// crates/outpass-server/tests/server_flow.rs
// ============================================================================
// Module: Server Flow Tests
// Description: Exercise submit, approve, scan, sweep, and snapshot flows
//              through the server state over both store backends.
// Purpose: Ensure the wired state preserves core semantics end to end.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;

use outpass_core::ActorId;
use outpass_core::ApprovalTier;
use outpass_core::GateAction;
use outpass_core::GateActionMode;
use outpass_core::GatePolicy;
use outpass_core::GateStatus;
use outpass_core::HolidayBehavior;
use outpass_core::LifecycleConfig;
use outpass_core::LogActionRequest;
use outpass_core::LogOutcome;
use outpass_core::LogSource;
use outpass_core::PassKind;
use outpass_core::PassRequest;
use outpass_core::PassStatus;
use outpass_core::PolicyStore;
use outpass_core::RegNo;
use outpass_core::StudentCategory;
use outpass_core::StudentProfile;
use outpass_core::SubmitRequest;
use outpass_core::WeekdayCalendar;
use outpass_server::AppState;
use outpass_server::AuditSink;
use outpass_server::GateAuditEvent;
use outpass_server::NoopAuditSink;
use outpass_server::RequestAuditEvent;
use outpass_server::RequestLimits;
use outpass_server::SweepAuditEvent;
use outpass_server::sweep_once;
use outpass_server::wall_clock;
use outpass_store_sqlite::SqliteStore;
use outpass_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;

/// Audit sink that captures sweep events for assertions.
struct CapturingSink {
    sweeps: Mutex<Vec<SweepAuditEvent>>,
}

impl CapturingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sweeps: Mutex::new(Vec::new()),
        })
    }
}

impl AuditSink for CapturingSink {
    fn record_request(&self, _event: &RequestAuditEvent) {}

    fn record_gate(&self, _event: &GateAuditEvent) {}

    fn record_sweep(&self, event: &SweepAuditEvent) {
        self.sweeps.lock().unwrap().push(event.clone());
    }
}

fn limits() -> RequestLimits {
    RequestLimits {
        max_body_bytes: 65_536,
        request_timeout_ms: 10_000,
    }
}

/// Unconstrained two-way policy so flows are independent of the test's wall
/// clock: no working window, holidays allowed, warden-only chain.
fn open_policy() -> GatePolicy {
    GatePolicy {
        category: StudentCategory::Hostel,
        pass_kind: PassKind::new("outing"),
        working_window: None,
        holiday_behavior: HolidayBehavior::Allow,
        holiday_window: None,
        gate_action: GateActionMode::ScanBoth,
        max_duration_hours: None,
        grace_minutes: 30,
        approval_chain: vec![ApprovalTier::Warden],
    }
}

fn reg_no() -> RegNo {
    RegNo::new("23BCE1001")
}

fn student() -> StudentProfile {
    StudentProfile {
        reg_no: reg_no(),
        name: "Asha Verma".to_string(),
        category: StudentCategory::Hostel,
    }
}

fn seeded_state(audit: Arc<dyn AuditSink>) -> AppState {
    let state = AppState::in_memory(
        LifecycleConfig::default(),
        WeekdayCalendar::default(),
        audit,
        limits(),
    );
    state.policies().put(&open_policy()).unwrap();
    state.enroller().register(&student()).unwrap();
    state
}

fn submit_approved(state: &AppState, departure_offset_minutes: i64) -> PassRequest {
    let now = wall_clock();
    let departure = now.plus_minutes(departure_offset_minutes);
    let submit = SubmitRequest {
        reg_no: reg_no(),
        pass_kind: PassKind::new("outing"),
        reason: "library run".to_string(),
        departure_at: departure,
        return_at: Some(departure.plus_minutes(240)),
    };
    let request = state.manager().submit(&submit, now).unwrap();
    state
        .manager()
        .approve(request.id, ApprovalTier::Warden, &ActorId::new("warden-1"), now)
        .unwrap()
}

fn log(state: &AppState, request: &PassRequest, action: GateAction) -> LogOutcome {
    let log = LogActionRequest {
        request_id: request.id,
        action,
        gatekeeper_id: ActorId::new("gate-1"),
        comments: None,
        source: LogSource::Online,
    };
    state.verifier().log_action(&log, wall_clock()).unwrap()
}

// ============================================================================
// SECTION: Memory Backend
// ============================================================================

#[test]
fn two_way_pass_flows_from_approval_to_completion() {
    let state = seeded_state(Arc::new(NoopAuditSink));
    let request = submit_approved(&state, 5);
    assert_eq!(request.status, PassStatus::ApprovedWarden);

    let outcome = state.verifier().verify(&reg_no(), wall_clock()).unwrap();
    assert_eq!(outcome.status, GateStatus::Valid);
    assert_eq!(outcome.allowed_actions, vec![GateAction::Exit]);

    let snapshot = state.verifier().snapshot(wall_clock()).unwrap();
    assert!(snapshot.find(&reg_no()).is_some());

    assert!(matches!(
        log(&state, &request, GateAction::Exit),
        LogOutcome::Applied {
            to: PassStatus::Active,
            ..
        }
    ));
    let outcome = state.verifier().verify(&reg_no(), wall_clock()).unwrap();
    assert_eq!(outcome.status, GateStatus::Out);
    assert_eq!(outcome.allowed_actions, vec![GateAction::Entry]);

    assert!(matches!(
        log(&state, &request, GateAction::Entry),
        LogOutcome::Applied {
            to: PassStatus::Completed,
            ..
        }
    ));
    let outcome = state.verifier().verify(&reg_no(), wall_clock()).unwrap();
    assert_eq!(outcome.status, GateStatus::Invalid);

    let snapshot = state.verifier().snapshot(wall_clock()).unwrap();
    assert!(snapshot.records.is_empty());
}

#[test]
fn replayed_scans_collapse_to_a_no_op() {
    let state = seeded_state(Arc::new(NoopAuditSink));
    let request = submit_approved(&state, 5);
    assert!(matches!(log(&state, &request, GateAction::Exit), LogOutcome::Applied { .. }));
    assert!(matches!(log(&state, &request, GateAction::Exit), LogOutcome::AlreadyApplied));
}

#[test]
fn sweep_expires_overdue_passes_and_audits_the_change() {
    let capture = CapturingSink::new();
    let state = seeded_state(Arc::clone(&capture) as Arc<dyn AuditSink>);
    // Departure two hours ago, return four hours later puts return_at well
    // past grace only after the pass goes unused; use a span already over.
    let now = wall_clock();
    let submit = SubmitRequest {
        reg_no: reg_no(),
        pass_kind: PassKind::new("outing"),
        reason: "weekend trip".to_string(),
        departure_at: now.minus_minutes(180),
        return_at: Some(now.minus_minutes(60)),
    };
    let request = state.manager().submit(&submit, now).unwrap();
    state
        .manager()
        .approve(request.id, ApprovalTier::Warden, &ActorId::new("warden-1"), now)
        .unwrap();

    sweep_once(&state);

    let swept = state.manager().request_required(request.id).unwrap();
    assert_eq!(swept.status, PassStatus::Expired);
    let events = capture.sweeps.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].expired.contains(&request.id.value()));
}

#[test]
fn quiet_sweeps_emit_no_audit_events() {
    let capture = CapturingSink::new();
    let state = seeded_state(Arc::clone(&capture) as Arc<dyn AuditSink>);
    sweep_once(&state);
    assert!(capture.sweeps.lock().unwrap().is_empty());
}

// ============================================================================
// SECTION: Sqlite Backend
// ============================================================================

fn sqlite_state(dir: &TempDir) -> AppState {
    let config = SqliteStoreConfig::for_path(dir.path().join("outpass.db"));
    let store = Arc::new(SqliteStore::open(&config).unwrap());
    AppState::with_sqlite(
        store,
        LifecycleConfig::default(),
        WeekdayCalendar::default(),
        Arc::new(NoopAuditSink),
        limits(),
    )
}

#[test]
fn sqlite_backed_state_runs_the_same_flow_durably() {
    let dir = TempDir::new().unwrap();
    let request = {
        let state = sqlite_state(&dir);
        state.policies().put(&open_policy()).unwrap();
        state.enroller().register(&student()).unwrap();
        let request = submit_approved(&state, 5);
        assert!(matches!(log(&state, &request, GateAction::Exit), LogOutcome::Applied { .. }));
        request
    };

    // A fresh state over the same file sees the student still out.
    let state = sqlite_state(&dir);
    let reloaded = state.manager().request_required(request.id).unwrap();
    assert_eq!(reloaded.status, PassStatus::Active);
    let outcome = state.verifier().verify(&reg_no(), wall_clock()).unwrap();
    assert_eq!(outcome.status, GateStatus::Out);
}
