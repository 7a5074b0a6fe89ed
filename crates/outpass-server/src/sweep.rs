// crates/outpass-server/src/sweep.rs
// ============================================================================
// Module: Outpass Expiry Sweep Worker
// Description: Periodic expiry of passes whose return window elapsed.
// Purpose: Run `sweep_expired` on an interval and audit the results.
// Dependencies: outpass-core, tokio
// ============================================================================

//! ## Overview
//! One sweep task per process. The lifecycle manager's conditional updates
//! make concurrent sweeps across instances safe, so the worker never takes
//! a cross-process lock; it just ticks, sweeps, and audits anything that
//! changed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::audit::SweepAuditEvent;
use crate::state::AppState;
use crate::state::run_blocking;
use crate::state::wall_clock;

// ============================================================================
// SECTION: Worker
// ============================================================================

/// Spawns the periodic expiry sweeper.
#[must_use]
pub fn spawn(state: AppState, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(&state);
        }
    })
}

/// Runs one sweep pass and audits any state change or failure.
pub fn sweep_once(state: &AppState) {
    match run_blocking(|| state.manager().sweep_expired(wall_clock())) {
        Ok(report) => {
            if !report.expired.is_empty() || !report.failures.is_empty() {
                state.audit().record_sweep(&SweepAuditEvent::completed(&report));
            }
        }
        Err(error) => {
            state.audit().record_sweep(&SweepAuditEvent::failed(error.to_string()));
        }
    }
}
