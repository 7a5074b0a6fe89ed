// crates/outpass-core/src/runtime/resolver.rs
// ============================================================================
// Module: Outpass Policy Resolver
// Description: Pure decision function over policy, time, and trust inputs.
// Purpose: Answer "is this pass usable right now" with a stable reason code.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The resolver is a pure, deterministic function: identical inputs always
//! yield an identical [`Decision`], including the machine-readable reason.
//! Callers must branch on [`DecisionReason`], never on free text. Holiday
//! classification and trust derivation happen at the boundary; the resolver
//! receives them as plain inputs so it stays fully unit-testable against
//! fixed clocks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::DayKind;
use crate::core::GatePolicy;
use crate::core::HolidayBehavior;
use crate::core::TimeError;
use crate::core::TimeWindow;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Decision Types
// ============================================================================

/// Machine-readable outcome reason.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The action is permitted.
    Allowed,
    /// Current time falls outside the applicable window.
    OutsideWorkingHours,
    /// Policy blocks use on holidays.
    HolidayBlocked,
    /// Derived trust score is at or below the blocking threshold.
    TrustScoreBlocked,
    /// Proposed pass span exceeds the policy's duration cap.
    DurationExceeded,
}

/// Resolver output.
///
/// # Invariants
/// - `allowed` is `true` iff `reason == Allowed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the action is permitted.
    pub allowed: bool,
    /// Machine-readable reason code.
    pub reason: DecisionReason,
    /// Window that applied to the decision, when one exists.
    pub effective_window: Option<TimeWindow>,
}

impl Decision {
    /// Builds an allowing decision.
    #[must_use]
    pub const fn allow(effective_window: Option<TimeWindow>) -> Self {
        Self {
            allowed: true,
            reason: DecisionReason::Allowed,
            effective_window,
        }
    }

    /// Builds a denying decision.
    #[must_use]
    pub const fn deny(reason: DecisionReason, effective_window: Option<TimeWindow>) -> Self {
        Self {
            allowed: false,
            reason,
            effective_window,
        }
    }
}

/// Proposed pass span supplied at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedWindow {
    /// Planned departure time.
    pub departure_at: Timestamp,
    /// Planned return time; `None` for one-way passes.
    pub return_at: Option<Timestamp>,
}

/// Inputs to one resolver call, assembled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveContext {
    /// Instant the decision applies to.
    pub now: Timestamp,
    /// Classification of the civil day containing `now`.
    pub day: DayKind,
    /// Derived trust score of the student.
    pub trust_score: i64,
    /// Threshold at or below which submissions are blocked.
    pub min_threshold: i64,
    /// Proposed pass span, when validating a submission.
    pub proposed: Option<ProposedWindow>,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves whether the policy permits use at the given instant.
///
/// Precedence: trust block, then duration cap, then day/window rules.
///
/// # Errors
///
/// Returns [`TimeError`] when `ctx.now` cannot be projected onto a civil
/// day.
pub fn resolve(policy: &GatePolicy, ctx: &ResolveContext) -> Result<Decision, TimeError> {
    if ctx.trust_score <= ctx.min_threshold {
        return Ok(Decision::deny(DecisionReason::TrustScoreBlocked, None));
    }

    if let Some(cap_hours) = policy.max_duration_hours
        && let Some(proposed) = &ctx.proposed
        && let Some(return_at) = proposed.return_at
    {
        let span = proposed.departure_at.span_millis_until(return_at);
        if span > Timestamp::hours_as_millis(cap_hours) {
            return Ok(Decision::deny(DecisionReason::DurationExceeded, None));
        }
    }

    let civil = ctx.now.civil()?;
    match ctx.day {
        DayKind::Working => match &policy.working_window {
            None => Ok(Decision::allow(None)),
            Some(window) => {
                if window.contains(civil.time_of_day) {
                    Ok(Decision::allow(Some(*window)))
                } else {
                    Ok(Decision::deny(DecisionReason::OutsideWorkingHours, Some(*window)))
                }
            }
        },
        DayKind::Holiday => match policy.holiday_behavior {
            HolidayBehavior::Block => Ok(Decision::deny(DecisionReason::HolidayBlocked, None)),
            HolidayBehavior::Allow => Ok(Decision::allow(None)),
            HolidayBehavior::CustomWindow => policy.holiday_window.map_or_else(
                // Validation forbids this shape; fail closed if it leaks in.
                || Ok(Decision::deny(DecisionReason::HolidayBlocked, None)),
                |window| {
                    if window.contains(civil.time_of_day) {
                        Ok(Decision::allow(Some(window)))
                    } else {
                        Ok(Decision::deny(DecisionReason::OutsideWorkingHours, Some(window)))
                    }
                },
            ),
        },
    }
}
