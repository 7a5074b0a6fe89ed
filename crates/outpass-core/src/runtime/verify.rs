// crates/outpass-core/src/runtime/verify.rs
// ============================================================================
// Module: Outpass Gate Verification Service
// Description: Synchronous scan-time decision path and idempotent action log.
// Purpose: Answer "what gate action is permitted right now" for a scanned
//          identity, and record scan outcomes exactly once.
// Dependencies: crate::{core, interfaces, runtime}, serde
// ============================================================================

//! ## Overview
//! The verifier is the synchronous path hit at every physical gate scan.
//! `verify` combines the student's current lifecycle state, the governing
//! policy's scanning mode, and the policy resolver into a status and an
//! `allowed_actions` set. `log_action` re-validates against current state at
//! write time (never against client-cached state) and is idempotent under
//! replay: an action whose transition has already been applied is a no-op
//! success, not a duplicate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::ActorId;
use crate::core::CacheSnapshot;
use crate::core::GateAction;
use crate::core::GateLog;
use crate::core::GatePolicy;
use crate::core::GateStatus;
use crate::core::LogSource;
use crate::core::PassRequest;
use crate::core::PassStatus;
use crate::core::PassSummary;
use crate::core::RegNo;
use crate::core::RequestId;
use crate::core::SnapshotRecord;
use crate::core::Timestamp;
use crate::interfaces::GateLogStore;
use crate::interfaces::HolidayCalendar;
use crate::interfaces::PolicyStore;
use crate::interfaces::RequestStore;
use crate::interfaces::StudentDirectory;
use crate::interfaces::StudentProfile;
use crate::interfaces::TrustLedger;
use crate::runtime::lifecycle::LifecycleError;
use crate::runtime::lifecycle::LifecycleManager;
use crate::runtime::lifecycle::ScanTransition;
use crate::runtime::resolver::ResolveContext;
use crate::runtime::resolver::resolve;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of verifying a scanned identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    /// Scan status shown to the gatekeeper.
    pub status: GateStatus,
    /// Gate actions permitted right now.
    pub allowed_actions: Vec<GateAction>,
    /// Student record, when the registration number is enrolled.
    pub student: Option<StudentProfile>,
    /// Current non-terminal pass, when one exists.
    pub pass: Option<PassSummary>,
    /// Set when the outcome was derived from a stale local cache.
    pub stale: bool,
}

impl VerifyOutcome {
    /// Builds an `invalid` outcome with no permitted actions.
    #[must_use]
    pub const fn invalid(student: Option<StudentProfile>, pass: Option<PassSummary>) -> Self {
        Self {
            status: GateStatus::Invalid,
            allowed_actions: Vec::new(),
            student,
            pass,
            stale: false,
        }
    }
}

/// Result of logging a gate action.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogOutcome {
    /// Action applied and the lifecycle transitioned.
    Applied {
        /// Status before the scan.
        from: PassStatus,
        /// Status after the scan.
        to: PassStatus,
        /// Whether the return arrived past the grace deadline.
        late: bool,
    },
    /// Replay of an already-applied action; no state change.
    AlreadyApplied,
}

/// Gate action submission from a terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogActionRequest {
    /// Request the scan applies to.
    pub request_id: RequestId,
    /// Action performed.
    pub action: GateAction,
    /// Gatekeeper who performed the scan.
    pub gatekeeper_id: ActorId,
    /// Optional gatekeeper comments.
    pub comments: Option<String>,
    /// Provenance of the submission.
    pub source: LogSource,
}

// ============================================================================
// SECTION: Gate Verifier
// ============================================================================

/// Gate verification service over the lifecycle manager and gate log store.
pub struct GateVerifier<R, P, T, D, C, G> {
    /// Lifecycle manager providing state and transitions.
    manager: LifecycleManager<R, P, T, D, C>,
    /// Append-only gate log store.
    logs: G,
}

impl<R, P, T, D, C, G> GateVerifier<R, P, T, D, C, G>
where
    R: RequestStore,
    P: PolicyStore,
    T: TrustLedger,
    D: StudentDirectory,
    C: HolidayCalendar,
    G: GateLogStore,
{
    /// Creates a gate verifier.
    #[must_use]
    pub const fn new(manager: LifecycleManager<R, P, T, D, C>, logs: G) -> Self {
        Self {
            manager,
            logs,
        }
    }

    /// Returns the underlying lifecycle manager.
    #[must_use]
    pub const fn manager(&self) -> &LifecycleManager<R, P, T, D, C> {
        &self.manager
    }

    /// Verifies a scanned registration number against current server state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] only on store or time failures; business
    /// outcomes (no pass, blocked direction) are statuses, not errors.
    pub fn verify(&self, reg_no: &RegNo, now: Timestamp) -> Result<VerifyOutcome, LifecycleError> {
        let Some(student) = self.manager.student_of(reg_no)? else {
            return Ok(VerifyOutcome::invalid(None, None));
        };
        let Some(request) = self.manager.find_active(reg_no)? else {
            return Ok(VerifyOutcome::invalid(Some(student), None));
        };
        let Ok(policy) = self.manager.policy_required(request.category, &request.pass_kind) else {
            return Ok(VerifyOutcome::invalid(Some(student), None));
        };
        let pass = self.summarize(&request)?;

        let outcome = match request.status {
            PassStatus::Active => Self::classify_active(&request, &policy, now),
            status if status.is_fully_approved(&policy.approval_chain) => {
                self.classify_awaiting_exit(&request, &policy, now)?
            }
            // Pending or partially approved: no qualifying pass yet.
            _ => (GateStatus::Invalid, Vec::new()),
        };
        Ok(VerifyOutcome {
            status: outcome.0,
            allowed_actions: outcome.1,
            student: Some(student),
            pass: Some(pass),
            stale: false,
        })
    }

    /// Logs a gate action, re-validating against current state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when a concurrent
    /// transition won (the caller should prompt a rescan), and the
    /// lifecycle's policy errors when the action is not permitted.
    pub fn log_action(
        &self,
        request: &LogActionRequest,
        now: Timestamp,
    ) -> Result<LogOutcome, LifecycleError> {
        let current = self.manager.request_required(request.request_id)?;
        if self.already_applied(&current, request, now)? {
            return Ok(LogOutcome::AlreadyApplied);
        }

        let transition = self.manager.record_gate_scan(
            request.request_id,
            request.action,
            &request.gatekeeper_id,
            now,
        )?;
        self.append_log(&current, request, now)?;
        Ok(Self::applied(transition))
    }

    /// Exports the snapshot of students holding a non-terminal pass.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when any backing store cannot be read.
    pub fn snapshot(&self, now: Timestamp) -> Result<CacheSnapshot, LifecycleError> {
        let mut records = Vec::new();
        for request in self.manager.list_non_terminal()? {
            let Some(student) = self.manager.student_of(&request.student_id)? else {
                continue;
            };
            let trust_score = self.manager.trust_score_of(&request.student_id)?;
            let pass = self.summarize(&request)?;
            records.push(SnapshotRecord {
                reg_no: student.reg_no,
                name: student.name,
                trust_score,
                pass,
            });
        }
        records.sort_by(|a, b| a.reg_no.cmp(&b.reg_no));
        Ok(CacheSnapshot {
            generated_at: now,
            records,
        })
    }

    /// Builds the compact pass projection, including the last gate action.
    fn summarize(&self, request: &PassRequest) -> Result<PassSummary, LifecycleError> {
        let last_action = self.logs.list_for(request.id)?.last().map(|log| log.action);
        Ok(PassSummary {
            id: request.id,
            status: request.status,
            pass_kind: request.pass_kind.clone(),
            departure_at: request.departure_at,
            return_at: request.return_at,
            last_action,
        })
    }

    /// Detects a replay of an action whose transition already applied.
    ///
    /// A status only the action itself can produce counts as applied even
    /// when the log row is missing, covering a stop between the transition
    /// and its append; the row is restored so later summaries carry it.
    fn already_applied(
        &self,
        current: &PassRequest,
        request: &LogActionRequest,
        now: Timestamp,
    ) -> Result<bool, LifecycleError> {
        if Self::status_implies_applied(current.status, request.action) {
            if !self.logs.exists(current.id, request.action)? {
                self.append_log(current, request, now)?;
            }
            return Ok(true);
        }
        // The sweep reaches `expired` without any scan; only a recorded row
        // proves the action happened.
        if current.status == PassStatus::Expired {
            return Ok(self.logs.exists(current.id, request.action)?);
        }
        Ok(false)
    }

    /// Statuses that only the given action's transition can produce.
    const fn status_implies_applied(status: PassStatus, action: GateAction) -> bool {
        match action {
            GateAction::Exit => matches!(status, PassStatus::Active | PassStatus::Completed),
            GateAction::Entry => matches!(status, PassStatus::Completed),
        }
    }

    /// Appends the log row for an applied action.
    fn append_log(
        &self,
        current: &PassRequest,
        request: &LogActionRequest,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        self.logs.append(&GateLog {
            request_id: request.request_id,
            student_id: current.student_id.clone(),
            action: request.action,
            gatekeeper_id: request.gatekeeper_id.clone(),
            recorded_at: now,
            comments: request.comments.clone(),
            source: request.source,
        })?;
        Ok(())
    }

    /// Classifies an `active` pass awaiting its return scan.
    fn classify_active(
        request: &PassRequest,
        policy: &GatePolicy,
        now: Timestamp,
    ) -> (GateStatus, Vec<GateAction>) {
        if !policy.gate_action.expects_return() {
            return (GateStatus::Invalid, Vec::new());
        }
        let overdue = request
            .return_at
            .is_some_and(|return_at| now > return_at.plus_minutes(i64::from(policy.grace_minutes)));
        if overdue {
            (GateStatus::Overdue, vec![GateAction::Entry])
        } else {
            (GateStatus::Out, vec![GateAction::Entry])
        }
    }

    /// Classifies a fully approved pass awaiting its exit scan.
    fn classify_awaiting_exit(
        &self,
        request: &PassRequest,
        policy: &GatePolicy,
        now: Timestamp,
    ) -> Result<(GateStatus, Vec<GateAction>), LifecycleError> {
        if !policy.gate_action.permits_exit() {
            return Ok((GateStatus::Invalid, Vec::new()));
        }
        if let Some(return_at) = request.return_at
            && now > return_at
        {
            // Window elapsed unused; the sweep will confirm shortly.
            return Ok((GateStatus::Expired, Vec::new()));
        }
        let earliest = request.departure_at.minus_minutes(i64::from(policy.grace_minutes));
        if now < earliest {
            return Ok((GateStatus::Early, Vec::new()));
        }

        let trust_score = self.manager.trust_score_of(&request.student_id)?;
        let decision = resolve(policy, &ResolveContext {
            now,
            day: self.manager.day_kind_at(now)?,
            trust_score,
            min_threshold: self.manager.trust_settings().min_threshold,
            proposed: None,
        })?;
        if decision.allowed {
            Ok((GateStatus::Valid, vec![GateAction::Exit]))
        } else {
            Ok((GateStatus::Invalid, Vec::new()))
        }
    }

    /// Maps a completed transition to its log outcome.
    const fn applied(transition: ScanTransition) -> LogOutcome {
        LogOutcome::Applied {
            from: transition.from,
            to: transition.to,
            late: transition.late,
        }
    }
}
