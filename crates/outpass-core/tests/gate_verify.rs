// crates/outpass-core/tests/gate_verify.rs
// ============================================================================
// Module: Gate Verification Tests
// Description: Scan-time statuses, idempotent action logging, and snapshots.
// Purpose: Pin the verifier's outcomes against fixed clocks.
// Dependencies: outpass-core, time
// ============================================================================

//! Gate verifier tests over in-memory stores with fixed clocks.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use common::at;
use common::fixture;
use common::reg_no;
use outpass_core::ActorId;
use outpass_core::ApprovalTier;
use outpass_core::GateAction;
use outpass_core::GateLogStore;
use outpass_core::GateStatus;
use outpass_core::LifecycleError;
use outpass_core::LogActionRequest;
use outpass_core::LogOutcome;
use outpass_core::LogSource;
use outpass_core::PassKind;
use outpass_core::PassRequest;
use outpass_core::PassStatus;
use outpass_core::RegNo;
use outpass_core::RequestStore;
use outpass_core::SubmitRequest;
use outpass_core::Timestamp;
use time::macros::datetime;

fn approved_outing(fx: &common::Fixture) -> PassRequest {
    let submit = SubmitRequest {
        reg_no: reg_no(),
        pass_kind: PassKind::new("outing"),
        reason: "family visit".to_string(),
        departure_at: at(datetime!(2025-01-07 10:00 UTC)),
        return_at: Some(at(datetime!(2025-01-07 16:00 UTC))),
    };
    let request = fx.manager().submit(&submit, at(datetime!(2025-01-07 09:00 UTC))).unwrap();
    let warden = ActorId::new("warden-1");
    fx.manager()
        .approve(request.id, ApprovalTier::Warden, &warden, at(datetime!(2025-01-07 09:10 UTC)))
        .unwrap()
}

fn log_request(request: &PassRequest, action: GateAction) -> LogActionRequest {
    LogActionRequest {
        request_id: request.id,
        action,
        gatekeeper_id: ActorId::new("gate-1"),
        comments: None,
        source: LogSource::Online,
    }
}

fn log(fx: &common::Fixture, request: &PassRequest, action: GateAction, now: Timestamp) -> LogOutcome {
    fx.verifier.log_action(&log_request(request, action), now).unwrap()
}

// ============================================================================
// SECTION: Verification Statuses
// ============================================================================

#[test]
fn unknown_reg_no_is_invalid_with_no_student() {
    let fx = fixture();
    let outcome =
        fx.verifier.verify(&RegNo::new("99XYZ0000"), at(datetime!(2025-01-07 10:00 UTC))).unwrap();
    assert_eq!(outcome.status, GateStatus::Invalid);
    assert!(outcome.allowed_actions.is_empty());
    assert!(outcome.student.is_none());
    assert!(outcome.pass.is_none());
}

#[test]
fn student_without_a_pass_is_invalid() {
    let fx = fixture();
    let outcome = fx.verifier.verify(&reg_no(), at(datetime!(2025-01-07 10:00 UTC))).unwrap();
    assert_eq!(outcome.status, GateStatus::Invalid);
    assert!(outcome.student.is_some());
    assert!(outcome.pass.is_none());
}

#[test]
fn approved_pass_in_window_is_valid_for_exit() {
    let fx = fixture();
    let request = approved_outing(&fx);
    let outcome = fx.verifier.verify(&reg_no(), at(datetime!(2025-01-07 10:00 UTC))).unwrap();
    assert_eq!(outcome.status, GateStatus::Valid);
    assert_eq!(outcome.allowed_actions, vec![GateAction::Exit]);
    let pass = outcome.pass.unwrap();
    assert_eq!(pass.id, request.id);
    assert_eq!(pass.status, PassStatus::ApprovedWarden);
    assert!(!outcome.stale);
}

#[test]
fn pending_pass_is_invalid_at_the_gate() {
    let fx = fixture();
    let submit = SubmitRequest {
        reg_no: reg_no(),
        pass_kind: PassKind::new("outing"),
        reason: "family visit".to_string(),
        departure_at: at(datetime!(2025-01-07 10:00 UTC)),
        return_at: Some(at(datetime!(2025-01-07 16:00 UTC))),
    };
    fx.manager().submit(&submit, at(datetime!(2025-01-07 09:00 UTC))).unwrap();
    let outcome = fx.verifier.verify(&reg_no(), at(datetime!(2025-01-07 10:00 UTC))).unwrap();
    assert_eq!(outcome.status, GateStatus::Invalid);
    assert!(outcome.allowed_actions.is_empty());
}

#[test]
fn scan_before_departure_minus_grace_is_early() {
    let fx = fixture();
    approved_outing(&fx);
    let outcome = fx.verifier.verify(&reg_no(), at(datetime!(2025-01-07 09:15 UTC))).unwrap();
    assert_eq!(outcome.status, GateStatus::Early);
    assert!(outcome.allowed_actions.is_empty());

    // Inside the grace margin the exit becomes available.
    let close = fx.verifier.verify(&reg_no(), at(datetime!(2025-01-07 09:45 UTC))).unwrap();
    assert_eq!(close.status, GateStatus::Valid);
}

#[test]
fn active_pass_reads_out_then_overdue() {
    let fx = fixture();
    let request = approved_outing(&fx);
    log(&fx, &request, GateAction::Exit, at(datetime!(2025-01-07 10:00 UTC)));

    let out = fx.verifier.verify(&reg_no(), at(datetime!(2025-01-07 12:00 UTC))).unwrap();
    assert_eq!(out.status, GateStatus::Out);
    assert_eq!(out.allowed_actions, vec![GateAction::Entry]);

    let overdue = fx.verifier.verify(&reg_no(), at(datetime!(2025-01-07 17:00 UTC))).unwrap();
    assert_eq!(overdue.status, GateStatus::Overdue);
    assert_eq!(overdue.allowed_actions, vec![GateAction::Entry]);
}

#[test]
fn unused_pass_past_return_reads_expired() {
    let fx = fixture();
    approved_outing(&fx);
    let outcome = fx.verifier.verify(&reg_no(), at(datetime!(2025-01-07 16:30 UTC))).unwrap();
    assert_eq!(outcome.status, GateStatus::Expired);
    assert!(outcome.allowed_actions.is_empty());
}

// ============================================================================
// SECTION: Action Logging
// ============================================================================

#[test]
fn exit_and_entry_transitions_are_reported() {
    let fx = fixture();
    let request = approved_outing(&fx);

    let out = log(&fx, &request, GateAction::Exit, at(datetime!(2025-01-07 10:00 UTC)));
    assert_eq!(out, LogOutcome::Applied {
        from: PassStatus::ApprovedWarden,
        to: PassStatus::Active,
        late: false,
    });

    let back = log(&fx, &request, GateAction::Entry, at(datetime!(2025-01-07 17:00 UTC)));
    assert_eq!(back, LogOutcome::Applied {
        from: PassStatus::Active,
        to: PassStatus::Completed,
        late: true,
    });
}

#[test]
fn replayed_actions_are_idempotent() {
    let fx = fixture();
    let request = approved_outing(&fx);
    log(&fx, &request, GateAction::Exit, at(datetime!(2025-01-07 10:00 UTC)));

    // Terminal replay and mid-flight replay both collapse to a no-op.
    let replay = log(&fx, &request, GateAction::Exit, at(datetime!(2025-01-07 10:01 UTC)));
    assert_eq!(replay, LogOutcome::AlreadyApplied);

    log(&fx, &request, GateAction::Entry, at(datetime!(2025-01-07 15:00 UTC)));
    let exit_again = log(&fx, &request, GateAction::Exit, at(datetime!(2025-01-07 15:02 UTC)));
    assert_eq!(exit_again, LogOutcome::AlreadyApplied);
    let entry_again = log(&fx, &request, GateAction::Entry, at(datetime!(2025-01-07 15:03 UTC)));
    assert_eq!(entry_again, LogOutcome::AlreadyApplied);

    // One log row per applied action.
    assert_eq!(fx.verifier.manager().request_required(request.id).unwrap().status, PassStatus::Completed);
}

#[test]
fn entry_without_exit_is_an_invalid_transition() {
    let fx = fixture();
    let request = approved_outing(&fx);
    let err = fx
        .verifier
        .log_action(
            &log_request(&request, GateAction::Entry),
            at(datetime!(2025-01-07 12:00 UTC)),
        )
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
}

#[test]
fn transition_without_a_log_row_replays_as_already_applied() {
    let fx = fixture();
    let request = approved_outing(&fx);
    // The transition landed but the process stopped before the log append.
    assert!(
        fx.requests
            .update_status(
                request.id,
                PassStatus::ApprovedWarden,
                PassStatus::Active,
                at(datetime!(2025-01-07 10:00 UTC)),
            )
            .unwrap()
    );
    assert!(!fx.logs.exists(request.id, GateAction::Exit).unwrap());

    let replay = log(&fx, &request, GateAction::Exit, at(datetime!(2025-01-07 10:01 UTC)));
    assert_eq!(replay, LogOutcome::AlreadyApplied);
    // The missing row is restored for summaries and later replays.
    assert!(fx.logs.exists(request.id, GateAction::Exit).unwrap());
}

#[test]
fn exit_on_a_swept_pass_with_no_exit_row_is_refused() {
    let fx = fixture();
    let request = approved_outing(&fx);
    fx.manager().sweep_expired(at(datetime!(2025-01-07 16:30 UTC))).unwrap();

    // The pass expired unused; no exit ever happened, so none is fabricated.
    let err = fx
        .verifier
        .log_action(
            &log_request(&request, GateAction::Exit),
            at(datetime!(2025-01-07 16:31 UTC)),
        )
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    assert!(!fx.logs.exists(request.id, GateAction::Exit).unwrap());
}

#[test]
fn racing_exit_scans_apply_exactly_once() {
    let fx = fixture();
    let request = approved_outing(&fx);
    let now = at(datetime!(2025-01-07 10:00 UTC));
    let verifier = Arc::new(fx.verifier);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0 .. 2)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            let barrier = Arc::clone(&barrier);
            let scan = log_request(&request, GateAction::Exit);
            thread::spawn(move || {
                barrier.wait();
                verifier.log_action(&scan, now)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    let applied = results
        .iter()
        .filter(|result| matches!(result, Ok(LogOutcome::Applied { .. })))
        .count();
    assert_eq!(applied, 1);
    // The loser sees either the conditional-write refusal or the replay
    // no-op, never a second transition.
    for result in &results {
        assert!(matches!(
            result,
            Ok(LogOutcome::Applied { .. } | LogOutcome::AlreadyApplied)
                | Err(LifecycleError::InvalidTransition { .. })
        ));
    }
    assert_eq!(
        verifier.manager().request_required(request.id).unwrap().status,
        PassStatus::Active
    );
}

#[test]
fn logged_actions_surface_in_the_pass_summary() {
    let fx = fixture();
    let request = approved_outing(&fx);
    log(&fx, &request, GateAction::Exit, at(datetime!(2025-01-07 10:00 UTC)));
    let outcome = fx.verifier.verify(&reg_no(), at(datetime!(2025-01-07 12:00 UTC))).unwrap();
    assert_eq!(outcome.pass.unwrap().last_action, Some(GateAction::Exit));
}

// ============================================================================
// SECTION: Snapshot Export
// ============================================================================

#[test]
fn snapshot_covers_non_terminal_passes_only() {
    let fx = fixture();
    let request = approved_outing(&fx);

    let now = at(datetime!(2025-01-07 09:30 UTC));
    let snapshot = fx.verifier.snapshot(now).unwrap();
    assert_eq!(snapshot.generated_at, now);
    assert_eq!(snapshot.records.len(), 1);
    let record = &snapshot.records[0];
    assert_eq!(record.reg_no, reg_no());
    assert_eq!(record.trust_score, 100);
    assert_eq!(record.pass.id, request.id);

    // Completed passes drop out of the snapshot.
    log(&fx, &request, GateAction::Exit, at(datetime!(2025-01-07 10:00 UTC)));
    log(&fx, &request, GateAction::Entry, at(datetime!(2025-01-07 15:00 UTC)));
    let drained = fx.verifier.snapshot(at(datetime!(2025-01-07 15:30 UTC))).unwrap();
    assert!(drained.records.is_empty());
}

#[test]
fn snapshot_lookup_finds_records_by_reg_no() {
    let fx = fixture();
    approved_outing(&fx);
    let snapshot = fx.verifier.snapshot(at(datetime!(2025-01-07 09:30 UTC))).unwrap();
    assert!(snapshot.find(&reg_no()).is_some());
    assert!(snapshot.find(&RegNo::new("99XYZ0000")).is_none());
}
