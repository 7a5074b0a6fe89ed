//! Online-first terminal behavior over a scripted server API.
// crates/outpass-terminal/tests/terminal_flow.rs
// ============================================================================
// Module: Terminal Flow Tests
// Description: Offline verify fallback, queue capture, and drain replay.
// Purpose: Ensure outages degrade the terminal conservatively and recovery
//          replays every captured scan exactly once.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use outpass_config::BackoffConfig;
use outpass_config::TerminalConfig;
use outpass_core::ActorId;
use outpass_core::CacheSnapshot;
use outpass_core::GateAction;
use outpass_core::GateStatus;
use outpass_core::LogActionRequest;
use outpass_core::LogOutcome;
use outpass_core::LogSource;
use outpass_core::PassKind;
use outpass_core::PassStatus;
use outpass_core::PassSummary;
use outpass_core::RegNo;
use outpass_core::RequestId;
use outpass_core::SnapshotRecord;
use outpass_core::Timestamp;
use outpass_core::VerifyOutcome;
use outpass_terminal::ClientError;
use outpass_terminal::GateApi;
use outpass_terminal::GateTerminal;
use outpass_terminal::TerminalError;
use outpass_terminal::TerminalLogOutcome;
use tempfile::TempDir;

/// Scripted gate API; every unscripted call reports the server as down.
#[derive(Clone, Default)]
struct ScriptedApi {
    verify_results: Arc<Mutex<VecDeque<Result<VerifyOutcome, ClientError>>>>,
    log_results: Arc<Mutex<VecDeque<Result<LogOutcome, ClientError>>>>,
    snapshot: Arc<Mutex<Option<CacheSnapshot>>>,
    posted: Arc<Mutex<Vec<LogActionRequest>>>,
}

impl ScriptedApi {
    fn push_log(&self, result: Result<LogOutcome, ClientError>) {
        self.log_results.lock().unwrap().push_back(result);
    }

    fn set_snapshot(&self, snapshot: CacheSnapshot) {
        *self.snapshot.lock().unwrap() = Some(snapshot);
    }

    fn posted(&self) -> Vec<LogActionRequest> {
        self.posted.lock().unwrap().clone()
    }
}

fn offline() -> ClientError {
    ClientError::Network("connection refused".to_string())
}

impl GateApi for ScriptedApi {
    fn verify(&self, _reg_no: &RegNo) -> Result<VerifyOutcome, ClientError> {
        self.verify_results.lock().unwrap().pop_front().unwrap_or_else(|| Err(offline()))
    }

    fn log_action(&self, request: &LogActionRequest) -> Result<LogOutcome, ClientError> {
        self.posted.lock().unwrap().push(request.clone());
        self.log_results.lock().unwrap().pop_front().unwrap_or_else(|| Err(offline()))
    }

    fn fetch_snapshot(&self) -> Result<CacheSnapshot, ClientError> {
        self.snapshot.lock().unwrap().clone().ok_or_else(offline)
    }
}

fn config_in(dir: &TempDir) -> TerminalConfig {
    TerminalConfig {
        cache_path: dir.path().join("cache.json"),
        queue_path: dir.path().join("queue.json"),
        backoff: BackoffConfig {
            initial_ms: 1,
            max_ms: 2,
            multiplier: 2,
        },
        ..TerminalConfig::default()
    }
}

fn terminal_in(dir: &TempDir, api: ScriptedApi) -> GateTerminal<ScriptedApi> {
    GateTerminal::with_api(api, &config_in(dir), ActorId::new("gate-1")).unwrap()
}

fn summary(status: PassStatus) -> PassSummary {
    PassSummary {
        id: RequestId::new(7),
        status,
        pass_kind: PassKind::new("outing"),
        departure_at: Timestamp::from_unix_millis(10_000),
        return_at: Some(Timestamp::from_unix_millis(500_000)),
        last_action: None,
    }
}

fn snapshot_with(status: PassStatus) -> CacheSnapshot {
    CacheSnapshot {
        generated_at: Timestamp::from_unix_millis(9_000),
        records: vec![SnapshotRecord {
            reg_no: RegNo::new("23BCE1001"),
            name: "Asha Verma".to_string(),
            trust_score: 100,
            pass: summary(status),
        }],
    }
}

fn ts(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

// ============================================================================
// SECTION: Offline Verify
// ============================================================================

#[test]
fn offline_verify_answers_stale_from_the_cached_snapshot() {
    let dir = TempDir::new().unwrap();
    let api = ScriptedApi::default();
    api.set_snapshot(snapshot_with(PassStatus::ApprovedWarden));
    let mut terminal = terminal_in(&dir, api);
    terminal.refresh().unwrap();

    let outcome = terminal.verify(&RegNo::new("23BCE1001"), ts(20_000)).unwrap();
    assert!(outcome.stale);
    assert_eq!(outcome.status, GateStatus::Valid);
    assert_eq!(outcome.allowed_actions, vec![GateAction::Exit]);
    assert!(outcome.student.is_none());

    let unknown = terminal.verify(&RegNo::new("23BCE1099"), ts(20_000)).unwrap();
    assert!(unknown.stale);
    assert_eq!(unknown.status, GateStatus::Invalid);
    assert!(unknown.allowed_actions.is_empty());
}

#[test]
fn offline_verify_never_upgrades_a_partially_approved_pass() {
    let dir = TempDir::new().unwrap();
    let api = ScriptedApi::default();
    api.set_snapshot(snapshot_with(PassStatus::ApprovedStaff));
    let mut terminal = terminal_in(&dir, api);
    terminal.refresh().unwrap();

    let outcome = terminal.verify(&RegNo::new("23BCE1001"), ts(20_000)).unwrap();
    assert!(outcome.stale);
    assert_eq!(outcome.status, GateStatus::Invalid);
    assert!(outcome.allowed_actions.is_empty());
}

#[test]
fn offline_verify_tracks_the_cached_pass_window() {
    let dir = TempDir::new().unwrap();
    let api = ScriptedApi::default();
    api.set_snapshot(snapshot_with(PassStatus::ApprovedWarden));
    let mut terminal = terminal_in(&dir, api);
    terminal.refresh().unwrap();
    let reg_no = RegNo::new("23BCE1001");

    let early = terminal.verify(&reg_no, ts(5_000)).unwrap();
    assert_eq!(early.status, GateStatus::Early);
    let expired = terminal.verify(&reg_no, ts(600_000)).unwrap();
    assert_eq!(expired.status, GateStatus::Expired);
}

#[test]
fn offline_verify_of_an_active_pass_offers_the_return() {
    let dir = TempDir::new().unwrap();
    let api = ScriptedApi::default();
    api.set_snapshot(snapshot_with(PassStatus::Active));
    let mut terminal = terminal_in(&dir, api);
    terminal.refresh().unwrap();
    let reg_no = RegNo::new("23BCE1001");

    let out = terminal.verify(&reg_no, ts(20_000)).unwrap();
    assert_eq!(out.status, GateStatus::Out);
    assert_eq!(out.allowed_actions, vec![GateAction::Entry]);
    let overdue = terminal.verify(&reg_no, ts(600_000)).unwrap();
    assert_eq!(overdue.status, GateStatus::Overdue);
    assert_eq!(overdue.allowed_actions, vec![GateAction::Entry]);
}

#[test]
fn offline_verify_without_any_snapshot_surfaces_the_outage() {
    let dir = TempDir::new().unwrap();
    let terminal = terminal_in(&dir, ScriptedApi::default());
    let result = terminal.verify(&RegNo::new("23BCE1001"), ts(20_000));
    assert!(matches!(result, Err(TerminalError::Client(ClientError::Network(_)))));
}

// ============================================================================
// SECTION: Offline Log and Drain
// ============================================================================

#[test]
fn offline_log_queues_each_action_once() {
    let dir = TempDir::new().unwrap();
    let mut terminal = terminal_in(&dir, ScriptedApi::default());

    let first = terminal
        .log(RequestId::new(7), GateAction::Exit, Some("offline scan".to_string()), ts(20_000))
        .unwrap();
    assert_eq!(first, TerminalLogOutcome::Queued {
        newly_queued: true,
    });

    let replay = terminal.log(RequestId::new(7), GateAction::Exit, None, ts(21_000)).unwrap();
    assert_eq!(replay, TerminalLogOutcome::Queued {
        newly_queued: false,
    });
    assert_eq!(terminal.queue().len(), 1);
}

#[test]
fn queued_actions_survive_a_terminal_restart() {
    let dir = TempDir::new().unwrap();
    {
        let mut terminal = terminal_in(&dir, ScriptedApi::default());
        terminal.log(RequestId::new(7), GateAction::Exit, None, ts(20_000)).unwrap();
    }
    let reopened = terminal_in(&dir, ScriptedApi::default());
    assert_eq!(reopened.queue().len(), 1);
}

#[test]
fn drain_replays_fifo_with_offline_provenance() {
    let dir = TempDir::new().unwrap();
    let api = ScriptedApi::default();
    let mut terminal = terminal_in(&dir, api.clone());
    terminal.log(RequestId::new(7), GateAction::Exit, None, ts(20_000)).unwrap();
    terminal.log(RequestId::new(8), GateAction::Exit, None, ts(21_000)).unwrap();

    let applied = LogOutcome::Applied {
        from: PassStatus::ApprovedWarden,
        to: PassStatus::Active,
        late: false,
    };
    api.push_log(Ok(applied));
    api.push_log(Ok(LogOutcome::AlreadyApplied));

    let report = terminal.drain().unwrap();
    assert_eq!(report.applied, 2);
    assert!(report.dropped.is_empty());
    assert_eq!(report.remaining, 0);
    assert!(terminal.queue().is_empty());

    // First two posts were the live attempts; the replays follow in order.
    let posted = api.posted();
    let replays: Vec<&LogActionRequest> =
        posted.iter().filter(|request| request.source == LogSource::OfflineSynced).collect();
    assert_eq!(replays.len(), 2);
    assert_eq!(replays[0].request_id, RequestId::new(7));
    assert_eq!(replays[1].request_id, RequestId::new(8));
    assert_eq!(replays[0].gatekeeper_id, ActorId::new("gate-1"));
}

#[test]
fn drain_drops_definitively_rejected_actions_with_the_cause() {
    let dir = TempDir::new().unwrap();
    let api = ScriptedApi::default();
    let mut terminal = terminal_in(&dir, api.clone());
    terminal.log(RequestId::new(7), GateAction::Exit, None, ts(20_000)).unwrap();

    api.push_log(Err(ClientError::Rejected {
        status: 409,
        reason: "invalid_transition".to_string(),
        message: "pass is completed".to_string(),
    }));

    let report = terminal.drain().unwrap();
    assert_eq!(report.applied, 0);
    assert_eq!(report.dropped.len(), 1);
    assert!(report.dropped[0].1.contains("invalid_transition"));
    assert!(terminal.queue().is_empty());
}

#[test]
fn drain_keeps_the_queue_when_the_backoff_exhausts() {
    let dir = TempDir::new().unwrap();
    let api = ScriptedApi::default();
    let mut terminal = terminal_in(&dir, api);
    terminal.log(RequestId::new(7), GateAction::Exit, None, ts(20_000)).unwrap();

    // Every replay attempt hits the scripted outage.
    let report = terminal.drain().unwrap();
    assert_eq!(report.applied, 0);
    assert!(report.dropped.is_empty());
    assert_eq!(report.remaining, 1);
    assert_eq!(terminal.queue().len(), 1);
}
