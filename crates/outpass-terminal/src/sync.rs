// crates/outpass-terminal/src/sync.rs
// ============================================================================
// Module: Terminal Queue Drain
// Description: FIFO replay of queued actions with bounded retry backoff.
// Purpose: Flush offline scans to the server without losing order or
//          spinning on a dead link.
// Dependencies: outpass-config, outpass-core
// ============================================================================

//! ## Overview
//! A drain cycle replays the queue front-to-back. A retryable failure keeps
//! the item at the front and sleeps per the backoff schedule; once the
//! schedule is exhausted the cycle stops with the remainder intact. A
//! definitive rejection drops the item and records the cause, since the
//! server has ruled on it and replaying cannot change the answer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use outpass_config::BackoffConfig;
use outpass_core::LogOutcome;

use crate::client::ClientError;
use crate::queue::OfflineQueue;
use crate::queue::QueuedAction;
use crate::storage::PersistError;

// ============================================================================
// SECTION: Poster
// ============================================================================

/// Posts one queued action to the server's log endpoint.
pub trait ActionPoster {
    /// Replays a captured action.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] per the client's failure classification.
    fn post(&self, action: &QueuedAction) -> Result<LogOutcome, ClientError>;
}

// ============================================================================
// SECTION: Backoff
// ============================================================================

/// Bounded exponential retry delays.
///
/// # Invariants
/// - Delays grow by `multiplier` and never exceed `max_ms`.
/// - Exactly one delay at the cap is issued before the schedule ends.
/// - A delay that cannot grow further is the last one issued, so every
///   schedule terminates whatever the configured factor.
#[derive(Debug)]
pub struct Backoff {
    /// Delay bounds and growth factor.
    config: BackoffConfig,
    /// Delay to issue next, in milliseconds.
    next_ms: u64,
    /// Set once the capped delay has been issued.
    done: bool,
}

impl Backoff {
    /// Starts a fresh schedule at the initial delay.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            next_ms: config.initial_ms,
            done: false,
        }
    }

    /// Returns the next delay, or `None` once the schedule is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.done {
            return None;
        }
        let delay = self.next_ms.min(self.config.max_ms);
        let next =
            delay.saturating_mul(u64::from(self.config.multiplier)).min(self.config.max_ms);
        if next <= delay {
            self.done = true;
        }
        self.next_ms = next;
        Some(Duration::from_millis(delay))
    }
}

// ============================================================================
// SECTION: Drain
// ============================================================================

/// Outcome of one drain cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Actions the server accepted, including idempotent replays.
    pub applied: u32,
    /// Actions dropped after a definitive rejection, with the cause.
    pub dropped: Vec<(QueuedAction, String)>,
    /// Actions still queued when the cycle stopped.
    pub remaining: usize,
}

/// Replays the queue FIFO until it empties or the backoff is exhausted.
///
/// The backoff schedule restarts after every accepted action, so one slow
/// recovery does not starve the rest of the queue.
///
/// # Errors
///
/// Returns [`PersistError`] when the queue file cannot be updated after a
/// server ruling; the affected action stays queued.
pub fn drain<P, S>(
    queue: &mut OfflineQueue,
    poster: &P,
    backoff: BackoffConfig,
    mut sleep: S,
) -> Result<DrainReport, PersistError>
where
    P: ActionPoster,
    S: FnMut(Duration),
{
    let mut report = DrainReport::default();
    let mut schedule = Backoff::new(backoff);
    while let Some(action) = queue.front().cloned() {
        match poster.post(&action) {
            Ok(_) => {
                queue.pop_front()?;
                report.applied += 1;
                schedule = Backoff::new(backoff);
            }
            Err(error) if error.is_retryable() => match schedule.next_delay() {
                Some(delay) => sleep(delay),
                None => break,
            },
            Err(error) => {
                queue.pop_front()?;
                report.dropped.push((action, error.to_string()));
            }
        }
    }
    report.remaining = queue.len();
    Ok(report)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::time::Duration;

    use outpass_config::BackoffConfig;

    use super::Backoff;

    #[test]
    fn backoff_grows_to_the_cap_and_ends() {
        let mut schedule = Backoff::new(BackoffConfig {
            initial_ms: 100,
            max_ms: 400,
            multiplier: 2,
        });
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(400)));
        assert_eq!(schedule.next_delay(), None);
        assert_eq!(schedule.next_delay(), None);
    }

    #[test]
    fn backoff_with_initial_at_the_cap_issues_one_delay() {
        let mut schedule = Backoff::new(BackoffConfig {
            initial_ms: 500,
            max_ms: 500,
            multiplier: 3,
        });
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(500)));
        assert_eq!(schedule.next_delay(), None);
    }

    #[test]
    fn backoff_that_cannot_grow_ends_after_one_delay() {
        // Rejected by config validation, but the schedule must still end.
        let mut schedule = Backoff::new(BackoffConfig {
            initial_ms: 100,
            max_ms: 400,
            multiplier: 1,
        });
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(schedule.next_delay(), None);
    }
}
