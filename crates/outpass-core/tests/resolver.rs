// crates/outpass-core/tests/resolver.rs
// ============================================================================
// Module: Policy Resolver Tests
// Description: Decision outcomes across windows, holidays, trust, and caps.
// Purpose: Pin the resolver's reason codes against fixed clocks.
// Dependencies: outpass-core, time
// ============================================================================

//! Resolver decision tests with deterministic inputs.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use common::at;
use common::outing_policy;
use outpass_core::DayKind;
use outpass_core::DecisionReason;
use outpass_core::GatePolicy;
use outpass_core::HolidayBehavior;
use outpass_core::ProposedWindow;
use outpass_core::ResolveContext;
use outpass_core::TimeOfDay;
use outpass_core::TimeWindow;
use outpass_core::Timestamp;
use outpass_core::resolve;
use time::macros::datetime;

fn ctx(now: Timestamp, day: DayKind) -> ResolveContext {
    ResolveContext {
        now,
        day,
        trust_score: 80,
        min_threshold: 10,
        proposed: None,
    }
}

#[test]
fn allows_inside_working_window() {
    let policy = outing_policy();
    let now = at(datetime!(2025-01-07 10:00 UTC));
    let decision = resolve(&policy, &ctx(now, DayKind::Working)).unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.reason, DecisionReason::Allowed);
    assert_eq!(decision.effective_window, policy.working_window);
}

#[test]
fn denies_outside_working_window() {
    let policy = outing_policy();
    let now = at(datetime!(2025-01-07 20:00 UTC));
    let decision = resolve(&policy, &ctx(now, DayKind::Working)).unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::OutsideWorkingHours);
}

#[test]
fn window_end_is_exclusive_and_start_inclusive() {
    let policy = outing_policy();
    let start = at(datetime!(2025-01-07 08:00 UTC));
    let end = at(datetime!(2025-01-07 18:00 UTC));
    assert!(resolve(&policy, &ctx(start, DayKind::Working)).unwrap().allowed);
    assert!(!resolve(&policy, &ctx(end, DayKind::Working)).unwrap().allowed);
}

#[test]
fn denies_on_blocked_holiday_regardless_of_time() {
    let policy = outing_policy();
    let now = at(datetime!(2025-01-07 10:00 UTC));
    let decision = resolve(&policy, &ctx(now, DayKind::Holiday)).unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::HolidayBlocked);
}

#[test]
fn trust_block_takes_precedence_over_everything() {
    let policy = outing_policy();
    let now = at(datetime!(2025-01-07 10:00 UTC));
    let context = ResolveContext {
        trust_score: 5,
        ..ctx(now, DayKind::Working)
    };
    let decision = resolve(&policy, &context).unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::TrustScoreBlocked);
}

#[test]
fn score_exactly_at_threshold_is_blocked() {
    let policy = outing_policy();
    let now = at(datetime!(2025-01-07 10:00 UTC));
    let context = ResolveContext {
        trust_score: 10,
        ..ctx(now, DayKind::Working)
    };
    assert_eq!(
        resolve(&policy, &context).unwrap().reason,
        DecisionReason::TrustScoreBlocked
    );
}

#[test]
fn duration_cap_rejects_long_spans() {
    let policy = outing_policy();
    let departure = at(datetime!(2025-01-07 09:00 UTC));
    let context = ResolveContext {
        proposed: Some(ProposedWindow {
            departure_at: departure,
            return_at: Some(at(datetime!(2025-01-08 09:00 UTC))),
        }),
        ..ctx(departure, DayKind::Working)
    };
    let decision = resolve(&policy, &context).unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::DurationExceeded);
}

#[test]
fn duration_exactly_at_cap_is_allowed() {
    let policy = outing_policy();
    let departure = at(datetime!(2025-01-07 09:00 UTC));
    let context = ResolveContext {
        proposed: Some(ProposedWindow {
            departure_at: departure,
            return_at: Some(at(datetime!(2025-01-07 21:00 UTC))),
        }),
        ..ctx(departure, DayKind::Working)
    };
    // 21:00 falls outside the working window; only the cap is under test,
    // so the decision still resolves at 09:00.
    assert!(resolve(&policy, &context).unwrap().allowed);
}

#[test]
fn one_way_spans_skip_the_duration_cap() {
    let policy = outing_policy();
    let departure = at(datetime!(2025-01-07 09:00 UTC));
    let context = ResolveContext {
        proposed: Some(ProposedWindow {
            departure_at: departure,
            return_at: None,
        }),
        ..ctx(departure, DayKind::Working)
    };
    assert!(resolve(&policy, &context).unwrap().allowed);
}

#[test]
fn custom_holiday_window_applies_on_holidays_only() {
    let policy = GatePolicy {
        holiday_behavior: HolidayBehavior::CustomWindow,
        holiday_window: Some(
            TimeWindow::new(TimeOfDay::new(9, 0).unwrap(), TimeOfDay::new(12, 0).unwrap())
                .unwrap(),
        ),
        ..outing_policy()
    };
    let morning = at(datetime!(2025-01-07 10:00 UTC));
    let evening = at(datetime!(2025-01-07 14:00 UTC));
    assert!(resolve(&policy, &ctx(morning, DayKind::Holiday)).unwrap().allowed);
    let missed = resolve(&policy, &ctx(evening, DayKind::Holiday)).unwrap();
    assert_eq!(missed.reason, DecisionReason::OutsideWorkingHours);
    // Working days still use the working window.
    assert!(resolve(&policy, &ctx(morning, DayKind::Working)).unwrap().allowed);
}

#[test]
fn custom_behavior_without_window_fails_closed() {
    let policy = GatePolicy {
        holiday_behavior: HolidayBehavior::CustomWindow,
        holiday_window: None,
        ..outing_policy()
    };
    let now = at(datetime!(2025-01-07 10:00 UTC));
    let decision = resolve(&policy, &ctx(now, DayKind::Holiday)).unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::HolidayBlocked);
}

#[test]
fn overnight_window_wraps_midnight() {
    let policy = GatePolicy {
        working_window: Some(
            TimeWindow::new(TimeOfDay::new(22, 0).unwrap(), TimeOfDay::new(6, 0).unwrap())
                .unwrap(),
        ),
        ..outing_policy()
    };
    let late_night = at(datetime!(2025-01-07 23:30 UTC));
    let early_morning = at(datetime!(2025-01-07 05:00 UTC));
    let midday = at(datetime!(2025-01-07 12:00 UTC));
    assert!(resolve(&policy, &ctx(late_night, DayKind::Working)).unwrap().allowed);
    assert!(resolve(&policy, &ctx(early_morning, DayKind::Working)).unwrap().allowed);
    assert!(!resolve(&policy, &ctx(midday, DayKind::Working)).unwrap().allowed);
}

#[test]
fn missing_working_window_means_anytime() {
    let policy = GatePolicy {
        working_window: None,
        ..outing_policy()
    };
    let midnight = at(datetime!(2025-01-07 00:00 UTC));
    let decision = resolve(&policy, &ctx(midnight, DayKind::Working)).unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.effective_window, None);
}
