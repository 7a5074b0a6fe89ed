// crates/outpass-core/src/core/trust.rs
// ============================================================================
// Module: Outpass Trust Score Ledger Model
// Description: Append-only trust deltas and derived per-student scores.
// Purpose: Feed policy decisions with a reputation signal for auto-blocking.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Trust is an append-only log of score deltas per student. The current
//! score is derived, never stored: configured baseline plus the sum of
//! deltas, clamped to the configured bounds. Students whose derived score
//! falls at or below the minimum threshold are auto-blocked from new
//! submissions by the policy resolver.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::RegNo;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Trust Events
// ============================================================================

/// Reason code attached to a trust delta.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustReason {
    /// Student cancelled a pass after submitting it.
    CancelledAfterSubmit,
    /// Student returned after the pass window plus grace.
    LateReturn,
    /// Manual adjustment by an administrator.
    ManualAdjustment,
}

impl TrustReason {
    /// Returns the stable string form used by stores and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CancelledAfterSubmit => "cancelled_after_submit",
            Self::LateReturn => "late_return",
            Self::ManualAdjustment => "manual_adjustment",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cancelled_after_submit" => Some(Self::CancelledAfterSubmit),
            "late_return" => Some(Self::LateReturn),
            "manual_adjustment" => Some(Self::ManualAdjustment),
            _ => None,
        }
    }
}

/// Append-only trust score delta for one student.
///
/// # Invariants
/// - Events are never mutated, only appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustEvent {
    /// Student the delta applies to.
    pub student_id: RegNo,
    /// Signed score delta (penalties are negative).
    pub delta: i64,
    /// Reason code for the delta.
    pub reason: TrustReason,
    /// Time the delta was recorded.
    pub recorded_at: Timestamp,
}

// ============================================================================
// SECTION: Trust Settings
// ============================================================================

/// Global trust scoring settings.
///
/// # Invariants
/// - `min_threshold <= baseline <= max_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSettings {
    /// Starting score for students with no recorded events.
    pub baseline: i64,
    /// Scores at or below this value block new submissions.
    pub min_threshold: i64,
    /// Upper clamp for derived scores.
    pub max_score: i64,
    /// Penalty applied when a pass is cancelled after submission.
    pub cancel_penalty: i64,
    /// Penalty applied when a return scan arrives past grace.
    pub late_return_penalty: i64,
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            baseline: 100,
            min_threshold: 10,
            max_score: 100,
            cancel_penalty: 20,
            late_return_penalty: 10,
        }
    }
}

impl TrustSettings {
    /// Validates settings invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError`] when bounds are inconsistent or penalties are
    /// not positive.
    pub const fn validate(&self) -> Result<(), TrustError> {
        if self.min_threshold > self.baseline || self.baseline > self.max_score {
            return Err(TrustError::InconsistentBounds);
        }
        if self.cancel_penalty <= 0 || self.late_return_penalty <= 0 {
            return Err(TrustError::NonPositivePenalty);
        }
        Ok(())
    }
}

/// Trust settings validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustError {
    /// Bounds violate `min_threshold <= baseline <= max_score`.
    #[error("trust bounds must satisfy min_threshold <= baseline <= max_score")]
    InconsistentBounds,
    /// A penalty magnitude is zero or negative.
    #[error("trust penalties must be positive")]
    NonPositivePenalty,
}

// ============================================================================
// SECTION: Score Derivation
// ============================================================================

/// Derives the current score from settings and the student's event log.
///
/// The result is `baseline + sum(deltas)` clamped to
/// `[min_threshold, max_score]`.
#[must_use]
pub fn derive_score(settings: &TrustSettings, events: &[TrustEvent]) -> i64 {
    let total: i64 = events.iter().fold(settings.baseline, |acc, event| {
        acc.saturating_add(event.delta)
    });
    total.clamp(settings.min_threshold, settings.max_score)
}

/// Reports whether a derived score blocks new submissions.
#[must_use]
pub const fn is_blocked(settings: &TrustSettings, score: i64) -> bool {
    score <= settings.min_threshold
}
