// crates/outpass-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Outpass Request Lifecycle Manager
// Description: Pass state machine from submission to terminal state.
// Purpose: Advance requests through approval, exit, return, expiry, and
//          cancellation with conditional-write transitions.
// Dependencies: crate::{core, interfaces, runtime::resolver}, serde, thiserror
// ============================================================================

//! ## Overview
//! The lifecycle manager owns every pass transition. Each transition is a
//! compare-and-swap on the request store keyed by the expected current
//! status, so concurrent approvals, scans, and expiry sweeps cannot both
//! succeed on the same request; the loser observes `InvalidTransition` and
//! the caller surfaces a rescan prompt rather than retrying blindly.
//!
//! Side effects (trust penalties) are applied only after the guarded
//! transition succeeds, which makes them exactly-once per transition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ActorId;
use crate::core::ApprovalEvent;
use crate::core::ApprovalStage;
use crate::core::ApprovalTier;
use crate::core::DayKind;
use crate::core::GateAction;
use crate::core::GateActionMode;
use crate::core::GatePolicy;
use crate::core::NewPassRequest;
use crate::core::PassKind;
use crate::core::PassRequest;
use crate::core::PassStatus;
use crate::core::PolicyId;
use crate::core::RegNo;
use crate::core::RequestId;
use crate::core::TimeError;
use crate::core::Timestamp;
use crate::core::TrustEvent;
use crate::core::TrustReason;
use crate::core::TrustSettings;
use crate::core::derive_score;
use crate::interfaces::HolidayCalendar;
use crate::interfaces::PolicyStore;
use crate::interfaces::RequestStore;
use crate::interfaces::StoreError;
use crate::interfaces::StudentDirectory;
use crate::interfaces::StudentProfile;
use crate::interfaces::TrustLedger;
use crate::runtime::resolver::DecisionReason;
use crate::runtime::resolver::ProposedWindow;
use crate::runtime::resolver::ResolveContext;
use crate::runtime::resolver::resolve;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Rolling-window cancellation cooldown settings.
///
/// # Invariants
/// - `threshold >= 1` and `window_hours >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownSettings {
    /// Cancellations within the window that trigger the cooldown.
    pub threshold: u32,
    /// Rolling window length in hours.
    pub window_hours: u32,
}

impl Default for CooldownSettings {
    fn default() -> Self {
        Self {
            threshold: 3,
            window_hours: 24,
        }
    }
}

/// Lifecycle manager configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleConfig {
    /// Trust scoring settings.
    pub trust: TrustSettings,
    /// Cancellation cooldown settings.
    pub cooldown: CooldownSettings,
}

// ============================================================================
// SECTION: Requests and Results
// ============================================================================

/// Submission input from the student-facing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    /// Submitting student.
    pub reg_no: RegNo,
    /// Requested pass kind.
    pub pass_kind: PassKind,
    /// Free-text reason.
    pub reason: String,
    /// Planned departure time.
    pub departure_at: Timestamp,
    /// Planned return time; `None` for one-way pass kinds.
    pub return_at: Option<Timestamp>,
}

/// Edit input for a still-pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// Replacement reason.
    pub reason: String,
    /// Replacement departure time.
    pub departure_at: Timestamp,
    /// Replacement return time.
    pub return_at: Option<Timestamp>,
}

/// Completed gate-scan transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTransition {
    /// Status before the scan.
    pub from: PassStatus,
    /// Status after the scan.
    pub to: PassStatus,
    /// Whether the return arrived past the grace deadline.
    pub late: bool,
}

/// Outcome of one expiry sweep pass.
///
/// # Invariants
/// - One request's failure never aborts the sweep for others.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Requests transitioned to `expired` by this sweep.
    pub expired: Vec<RequestId>,
    /// Requests whose conditional update failed with a store error.
    pub failures: Vec<(RequestId, String)>,
}

/// Active submission cooldown for a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    /// Number of cancellations observed inside the rolling window.
    pub cancellations: u32,
    /// Instant the cooldown lifts.
    pub until: Timestamp,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Lifecycle operation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; callers surface the
///   reason codes verbatim and never infer outcomes from free text.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Student already holds a non-terminal request.
    #[error("student already holds an active pass")]
    DuplicateActivePass,
    /// Policy resolver denied the action.
    #[error("policy denied: {0:?}")]
    PolicyDenied(DecisionReason),
    /// Derived trust score is at or below the blocking threshold.
    #[error("trust score blocked")]
    TrustScoreBlocked,
    /// Cancellation cooldown is active for the student.
    #[error("submission cooldown active until {until:?}")]
    CooldownActive {
        /// Instant the cooldown lifts.
        until: Timestamp,
    },
    /// Request is not in a state that permits the transition.
    #[error("invalid transition from {from:?}")]
    InvalidTransition {
        /// Status observed when the transition was refused.
        from: PassStatus,
    },
    /// Policy's scanning mode forbids the requested gate action.
    #[error("gate action not permitted by policy mode {mode:?}")]
    ScanNotPermitted {
        /// Scanning mode configured on the policy.
        mode: GateActionMode,
    },
    /// Exit attempted before the departure window minus grace.
    #[error("exit attempted before the departure window")]
    EarlyExit,
    /// No request with the given identifier.
    #[error("unknown request: {0}")]
    UnknownRequest(RequestId),
    /// No enrolled student with the given registration number.
    #[error("unknown student: {0}")]
    UnknownStudent(RegNo),
    /// No policy configured for the (category, pass kind) pair.
    #[error("no policy for category/pass kind")]
    UnknownPolicy,
    /// Input failed shape validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Time conversion failure.
    #[error(transparent)]
    Time(#[from] TimeError),
    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Lifecycle Manager
// ============================================================================

/// Request lifecycle manager generic over storage and calendar interfaces.
pub struct LifecycleManager<R, P, T, D, C> {
    /// Request store.
    requests: R,
    /// Policy store.
    policies: P,
    /// Trust ledger.
    trust: T,
    /// Student directory.
    directory: D,
    /// Institutional holiday calendar.
    calendar: C,
    /// Manager configuration.
    config: LifecycleConfig,
}

impl<R, P, T, D, C> LifecycleManager<R, P, T, D, C>
where
    R: RequestStore,
    P: PolicyStore,
    T: TrustLedger,
    D: StudentDirectory,
    C: HolidayCalendar,
{
    /// Creates a new lifecycle manager.
    #[must_use]
    pub const fn new(
        requests: R,
        policies: P,
        trust: T,
        directory: D,
        calendar: C,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            requests,
            policies,
            trust,
            directory,
            calendar,
            config,
        }
    }

    /// Returns the configured trust settings.
    #[must_use]
    pub const fn trust_settings(&self) -> &TrustSettings {
        &self.config.trust
    }

    /// Submits a new pass request.
    ///
    /// The request is created in `pending` with no approval event; the
    /// first timeline entry is the eventual approval or rejection.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicateActivePass`] when the student
    /// already holds a non-terminal request,
    /// [`LifecycleError::CooldownActive`] during a cancellation cooldown,
    /// [`LifecycleError::TrustScoreBlocked`] or
    /// [`LifecycleError::PolicyDenied`] when the resolver denies the
    /// proposed departure, and [`LifecycleError::Validation`] on bad input.
    pub fn submit(
        &self,
        submit: &SubmitRequest,
        now: Timestamp,
    ) -> Result<PassRequest, LifecycleError> {
        let student = self.student_required(&submit.reg_no)?;
        let policy = self.policy_required(student.category, &submit.pass_kind)?;
        validate_span(&policy, submit.reason.as_str(), submit.departure_at, submit.return_at)?;

        if let Some(cooldown) = self.cooldown_for(&submit.reg_no, now)? {
            return Err(LifecycleError::CooldownActive {
                until: cooldown.until,
            });
        }

        self.resolve_for(&policy, &student.reg_no, submit.departure_at, Some(ProposedWindow {
            departure_at: submit.departure_at,
            return_at: submit.return_at,
        }))?;

        if self.requests.find_active(&submit.reg_no)?.is_some() {
            return Err(LifecycleError::DuplicateActivePass);
        }

        let created = self.requests.create(&NewPassRequest {
            student_id: submit.reg_no.clone(),
            category: student.category,
            pass_kind: submit.pass_kind.clone(),
            reason: submit.reason.clone(),
            departure_at: submit.departure_at,
            return_at: submit.return_at,
            created_at: now,
        });
        match created {
            Ok(request) => Ok(request),
            // The store's uniqueness guard closes the check-then-create race.
            Err(StoreError::Conflict(_)) => Err(LifecycleError::DuplicateActivePass),
            Err(err) => Err(err.into()),
        }
    }

    /// Edits a request that is still awaiting its first approval.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the request is no
    /// longer `pending`, or the same denials as [`Self::submit`] for the
    /// replacement span.
    pub fn edit(
        &self,
        id: RequestId,
        edit: &EditRequest,
        now: Timestamp,
    ) -> Result<PassRequest, LifecycleError> {
        let request = self.request_required(id)?;
        if request.status != PassStatus::Pending {
            return Err(LifecycleError::InvalidTransition {
                from: request.status,
            });
        }
        let policy = self.policy_required(request.category, &request.pass_kind)?;
        validate_span(&policy, edit.reason.as_str(), edit.departure_at, edit.return_at)?;
        self.resolve_for(&policy, &request.student_id, edit.departure_at, Some(ProposedWindow {
            departure_at: edit.departure_at,
            return_at: edit.return_at,
        }))?;

        let applied = self.requests.update_details(
            id,
            edit.reason.as_str(),
            edit.departure_at,
            edit.return_at,
            now,
        )?;
        if !applied {
            let current = self.request_required(id)?;
            return Err(LifecycleError::InvalidTransition {
                from: current.status,
            });
        }
        self.request_required(id)
    }

    /// Advances the request by one approval tier.
    ///
    /// Approval is a generic advance over the policy's ordered chain. A
    /// higher tier may approve while lower tiers are outstanding; doing so
    /// subsumes the earlier tiers. A tier that has already been passed is
    /// refused.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the request is not
    /// awaiting that tier, or when a concurrent transition won the race.
    pub fn approve(
        &self,
        id: RequestId,
        tier: ApprovalTier,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<PassRequest, LifecycleError> {
        let request = self.request_required(id)?;
        let policy = self.policy_required(request.category, &request.pass_kind)?;
        let outstanding = request.status.outstanding_tiers(&policy.approval_chain);
        if !outstanding.contains(&tier) {
            return Err(LifecycleError::InvalidTransition {
                from: request.status,
            });
        }

        let next = PassStatus::after_tier(tier);
        self.transition(&request, next, now)?;
        self.requests.append_event(&ApprovalEvent {
            request_id: id,
            stage: ApprovalStage::from_tier(tier),
            actor_id: actor.clone(),
            recorded_at: now,
            comments: None,
        })?;
        self.request_required(id)
    }

    /// Rejects the request. Any approval tier may terminate a non-terminal
    /// request; the transition is irreversible.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the request is
    /// already terminal or a concurrent transition won the race.
    pub fn reject(
        &self,
        id: RequestId,
        actor: &ActorId,
        comments: Option<String>,
        now: Timestamp,
    ) -> Result<PassRequest, LifecycleError> {
        let request = self.request_required(id)?;
        if request.status.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                from: request.status,
            });
        }
        self.transition(&request, PassStatus::Rejected, now)?;
        self.requests.append_event(&ApprovalEvent {
            request_id: id,
            stage: ApprovalStage::Rejected,
            actor_id: actor.clone(),
            recorded_at: now,
            comments,
        })?;
        self.request_required(id)
    }

    /// Cancels the request on the student's behalf.
    ///
    /// Valid only while non-terminal and not yet `active`. Applies the
    /// configured cancellation penalty exactly once: the penalty follows the
    /// guarded transition, so a losing racer never double-applies it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the request is
    /// terminal, already out through the gate, or a concurrent transition
    /// won the race.
    pub fn cancel(
        &self,
        id: RequestId,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<PassRequest, LifecycleError> {
        let request = self.request_required(id)?;
        if request.status.is_terminal() || request.status == PassStatus::Active {
            return Err(LifecycleError::InvalidTransition {
                from: request.status,
            });
        }
        self.transition(&request, PassStatus::Cancelled, now)?;
        self.requests.append_event(&ApprovalEvent {
            request_id: id,
            stage: ApprovalStage::Cancelled,
            actor_id: actor.clone(),
            recorded_at: now,
            comments: None,
        })?;
        self.trust.append(&TrustEvent {
            student_id: request.student_id.clone(),
            delta: -self.config.trust.cancel_penalty,
            reason: TrustReason::CancelledAfterSubmit,
            recorded_at: now,
        })?;
        self.request_required(id)
    }

    /// Records a physical gate scan against the request.
    ///
    /// Exit moves a fully approved request to `active` (two-way) or
    /// `completed` (one-way); entry moves `active` to `completed`. Late
    /// returns (past `return_at` plus grace) incur the late-return penalty.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ScanNotPermitted`] when the policy mode
    /// forbids the direction, [`LifecycleError::EarlyExit`] before the
    /// departure window, [`LifecycleError::PolicyDenied`] when the resolver
    /// denies the exit at scan time, and
    /// [`LifecycleError::InvalidTransition`] on state mismatches.
    pub fn record_gate_scan(
        &self,
        id: RequestId,
        action: GateAction,
        gatekeeper: &ActorId,
        now: Timestamp,
    ) -> Result<ScanTransition, LifecycleError> {
        let request = self.request_required(id)?;
        let policy = self.policy_required(request.category, &request.pass_kind)?;
        match action {
            GateAction::Exit => self.record_exit(&request, &policy, gatekeeper, now),
            GateAction::Entry => self.record_entry(&request, &policy, gatekeeper, now),
        }
    }

    /// Expires every request whose return window has elapsed.
    ///
    /// Unused approved passes expire once `return_at` passes; active passes
    /// expire after `return_at` plus grace, with the late-return penalty
    /// applied to the student who never scanned back in. Each request's
    /// update is independent and conditional, so the sweep is idempotent
    /// and safe to run concurrently with gate scans and other sweepers.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] only when the non-terminal listing
    /// itself fails; per-request failures are collected in the report.
    pub fn sweep_expired(&self, now: Timestamp) -> Result<SweepReport, LifecycleError> {
        let mut report = SweepReport::default();
        for request in self.requests.list_non_terminal()? {
            let Some(return_at) = request.return_at else {
                continue;
            };
            let deadline = match request.status {
                PassStatus::ApprovedStaff | PassStatus::ApprovedHod | PassStatus::ApprovedWarden => {
                    return_at
                }
                PassStatus::Active => match self.policy_required(request.category, &request.pass_kind)
                {
                    Ok(policy) => return_at.plus_minutes(i64::from(policy.grace_minutes)),
                    Err(_) => return_at,
                },
                _ => continue,
            };
            if now <= deadline {
                continue;
            }
            match self.requests.update_status(request.id, request.status, PassStatus::Expired, now)
            {
                Ok(true) => {
                    report.expired.push(request.id);
                    if request.status == PassStatus::Active {
                        // The student never scanned back in.
                        let penalty = self.trust.append(&TrustEvent {
                            student_id: request.student_id.clone(),
                            delta: -self.config.trust.late_return_penalty,
                            reason: TrustReason::LateReturn,
                            recorded_at: now,
                        });
                        if let Err(err) = penalty {
                            report.failures.push((request.id, err.to_string()));
                        }
                    }
                }
                // A concurrent scan won; the conditional guard makes that safe.
                Ok(false) => {}
                Err(err) => report.failures.push((request.id, err.to_string())),
            }
        }
        Ok(report)
    }

    /// Returns the student's active cooldown, if one is in force.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the trust ledger cannot be
    /// read.
    pub fn cooldown_for(
        &self,
        reg_no: &RegNo,
        now: Timestamp,
    ) -> Result<Option<Cooldown>, LifecycleError> {
        let window_minutes = i64::from(self.config.cooldown.window_hours) * 60;
        let window_start = now.minus_minutes(window_minutes);
        let events = self.trust.events_for(reg_no)?;
        let recent: Vec<&TrustEvent> = events
            .iter()
            .filter(|event| {
                event.reason == TrustReason::CancelledAfterSubmit
                    && event.recorded_at >= window_start
                    && event.recorded_at <= now
            })
            .collect();
        let count = u32::try_from(recent.len()).unwrap_or(u32::MAX);
        if count < self.config.cooldown.threshold {
            return Ok(None);
        }
        let newest =
            recent.iter().map(|event| event.recorded_at).max().unwrap_or(now);
        Ok(Some(Cooldown {
            cancellations: count,
            until: newest.plus_minutes(window_minutes),
        }))
    }

    /// Derives the student's current trust score.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the trust ledger cannot be
    /// read.
    pub fn trust_score_of(&self, reg_no: &RegNo) -> Result<i64, LifecycleError> {
        let events = self.trust.events_for(reg_no)?;
        Ok(derive_score(&self.config.trust, &events))
    }

    /// Loads a request, failing on unknown identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownRequest`] when no request exists.
    pub fn request_required(&self, id: RequestId) -> Result<PassRequest, LifecycleError> {
        self.requests.load(id)?.ok_or(LifecycleError::UnknownRequest(id))
    }

    /// Lists the approval timeline for a request, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the store cannot be read.
    pub fn events_for(&self, id: RequestId) -> Result<Vec<ApprovalEvent>, LifecycleError> {
        Ok(self.requests.events(id)?)
    }

    /// Finds the student's current non-terminal request.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the store cannot be read.
    pub fn find_active(&self, reg_no: &RegNo) -> Result<Option<PassRequest>, LifecycleError> {
        Ok(self.requests.find_active(reg_no)?)
    }

    /// Lists a student's requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the store cannot be read.
    pub fn list_by_student(
        &self,
        reg_no: &RegNo,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PassRequest>, LifecycleError> {
        Ok(self.requests.list_by_student(reg_no, offset, limit)?)
    }

    /// Lists every non-terminal request.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the store cannot be read.
    pub fn list_non_terminal(&self) -> Result<Vec<PassRequest>, LifecycleError> {
        Ok(self.requests.list_non_terminal()?)
    }

    /// Looks up an enrolled student, failing on unknown registration numbers.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownStudent`] when the student is not
    /// enrolled.
    pub fn student_required(&self, reg_no: &RegNo) -> Result<StudentProfile, LifecycleError> {
        self.directory
            .lookup(reg_no)?
            .ok_or_else(|| LifecycleError::UnknownStudent(reg_no.clone()))
    }

    /// Looks up a student without failing on absence.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the directory cannot be read.
    pub fn student_of(&self, reg_no: &RegNo) -> Result<Option<StudentProfile>, LifecycleError> {
        Ok(self.directory.lookup(reg_no)?)
    }

    /// Loads the policy governing a (category, pass kind) pair.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownPolicy`] when none is configured.
    pub fn policy_required(
        &self,
        category: crate::core::StudentCategory,
        pass_kind: &PassKind,
    ) -> Result<GatePolicy, LifecycleError> {
        self.policies
            .get(&PolicyId::new(category, pass_kind.clone()))?
            .ok_or(LifecycleError::UnknownPolicy)
    }

    /// Classifies the civil day containing the timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Time`] when the timestamp is out of range.
    pub fn day_kind_at(&self, at: Timestamp) -> Result<DayKind, LifecycleError> {
        let civil = at.civil()?;
        Ok(self.calendar.day_kind(civil.date))
    }

    /// Runs the resolver for a student at an instant, mapping denials.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TrustScoreBlocked`] or
    /// [`LifecycleError::PolicyDenied`] when the resolver denies.
    pub fn resolve_for(
        &self,
        policy: &GatePolicy,
        reg_no: &RegNo,
        at: Timestamp,
        proposed: Option<ProposedWindow>,
    ) -> Result<(), LifecycleError> {
        let trust_score = self.trust_score_of(reg_no)?;
        let decision = resolve(policy, &ResolveContext {
            now: at,
            day: self.day_kind_at(at)?,
            trust_score,
            min_threshold: self.config.trust.min_threshold,
            proposed,
        })?;
        if decision.allowed {
            return Ok(());
        }
        match decision.reason {
            DecisionReason::TrustScoreBlocked => Err(LifecycleError::TrustScoreBlocked),
            reason => Err(LifecycleError::PolicyDenied(reason)),
        }
    }

    /// Performs the guarded status transition for a loaded request.
    fn transition(
        &self,
        request: &PassRequest,
        next: PassStatus,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        let applied = self.requests.update_status(request.id, request.status, next, now)?;
        if applied {
            Ok(())
        } else {
            let from = self
                .requests
                .load(request.id)?
                .map_or(request.status, |current| current.status);
            Err(LifecycleError::InvalidTransition {
                from,
            })
        }
    }

    /// Handles an exit scan for a fully approved request.
    fn record_exit(
        &self,
        request: &PassRequest,
        policy: &GatePolicy,
        gatekeeper: &ActorId,
        now: Timestamp,
    ) -> Result<ScanTransition, LifecycleError> {
        if !policy.gate_action.permits_exit() {
            return Err(LifecycleError::ScanNotPermitted {
                mode: policy.gate_action,
            });
        }
        if !request.status.is_fully_approved(&policy.approval_chain) {
            return Err(LifecycleError::InvalidTransition {
                from: request.status,
            });
        }
        let earliest = request.departure_at.minus_minutes(i64::from(policy.grace_minutes));
        if now < earliest {
            return Err(LifecycleError::EarlyExit);
        }
        self.resolve_for(policy, &request.student_id, now, None)?;

        let next = if policy.gate_action.expects_return() {
            PassStatus::Active
        } else {
            PassStatus::Completed
        };
        self.transition(request, next, now)?;
        self.requests.append_event(&ApprovalEvent {
            request_id: request.id,
            stage: ApprovalStage::Exit,
            actor_id: gatekeeper.clone(),
            recorded_at: now,
            comments: None,
        })?;
        Ok(ScanTransition {
            from: request.status,
            to: next,
            late: false,
        })
    }

    /// Handles a return scan for an active request.
    fn record_entry(
        &self,
        request: &PassRequest,
        policy: &GatePolicy,
        gatekeeper: &ActorId,
        now: Timestamp,
    ) -> Result<ScanTransition, LifecycleError> {
        if !policy.gate_action.expects_return() {
            return Err(LifecycleError::ScanNotPermitted {
                mode: policy.gate_action,
            });
        }
        if request.status != PassStatus::Active {
            return Err(LifecycleError::InvalidTransition {
                from: request.status,
            });
        }
        self.transition(request, PassStatus::Completed, now)?;
        self.requests.append_event(&ApprovalEvent {
            request_id: request.id,
            stage: ApprovalStage::Return,
            actor_id: gatekeeper.clone(),
            recorded_at: now,
            comments: None,
        })?;
        let late = request
            .return_at
            .is_some_and(|return_at| now > return_at.plus_minutes(i64::from(policy.grace_minutes)));
        if late {
            self.trust.append(&TrustEvent {
                student_id: request.student_id.clone(),
                delta: -self.config.trust.late_return_penalty,
                reason: TrustReason::LateReturn,
                recorded_at: now,
            })?;
        }
        Ok(ScanTransition {
            from: request.status,
            to: PassStatus::Completed,
            late,
        })
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates the shape of a proposed pass span against its policy.
fn validate_span(
    policy: &GatePolicy,
    reason: &str,
    departure_at: Timestamp,
    return_at: Option<Timestamp>,
) -> Result<(), LifecycleError> {
    if reason.trim().is_empty() {
        return Err(LifecycleError::Validation("reason must not be empty".to_string()));
    }
    match return_at {
        Some(return_at) if return_at <= departure_at => {
            Err(LifecycleError::Validation("return must be after departure".to_string()))
        }
        None if policy.gate_action.expects_return() => Err(LifecycleError::Validation(
            "return time is required for two-way passes".to_string(),
        )),
        _ => Ok(()),
    }
}
