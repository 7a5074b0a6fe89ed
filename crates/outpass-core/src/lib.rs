// crates/outpass-core/src/lib.rs
// ============================================================================
// Module: Outpass Core Library
// Description: Deterministic campus gate-pass decision engine.
// Purpose: Decide pass requests, drive their lifecycle, and verify gate scans.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Outpass Core is the decision engine behind a campus gate-pass subsystem:
//! policies per (student category, pass kind), a pass request lifecycle with
//! an ordered approval chain, a derived trust score, and the synchronous
//! verification path gate terminals call on every scan.
//! Invariants:
//! - The resolver is pure and deterministic; identical inputs yield identical
//!   decisions with stable machine-readable reasons.
//! - A student holds at most one non-terminal pass request at any time.
//! - Every lifecycle transition is a conditional write on the expected
//!   current status.
//! - The core never reads the wall clock; hosts pass timestamps explicitly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::ActorId;
pub use self::core::ApprovalEvent;
pub use self::core::ApprovalStage;
pub use self::core::ApprovalTier;
pub use self::core::CacheSnapshot;
pub use self::core::CivilTime;
pub use self::core::DEFAULT_GRACE_MINUTES;
pub use self::core::DayKind;
pub use self::core::GateAction;
pub use self::core::GateActionMode;
pub use self::core::GateLog;
pub use self::core::GatePolicy;
pub use self::core::GateStatus;
pub use self::core::HolidayBehavior;
pub use self::core::LogSource;
pub use self::core::NewPassRequest;
pub use self::core::PassKind;
pub use self::core::PassRequest;
pub use self::core::PassStatus;
pub use self::core::PassSummary;
pub use self::core::PolicyError;
pub use self::core::PolicyId;
pub use self::core::RegNo;
pub use self::core::RequestId;
pub use self::core::SnapshotRecord;
pub use self::core::StudentCategory;
pub use self::core::TimeError;
pub use self::core::TimeOfDay;
pub use self::core::TimeWindow;
pub use self::core::Timestamp;
pub use self::core::TrustError;
pub use self::core::TrustEvent;
pub use self::core::TrustReason;
pub use self::core::TrustSettings;
pub use self::core::derive_score;
pub use self::core::is_blocked;
pub use interfaces::GateLogStore;
pub use interfaces::HolidayCalendar;
pub use interfaces::PolicyStore;
pub use interfaces::RequestStore;
pub use interfaces::StoreError;
pub use interfaces::StudentDirectory;
pub use interfaces::StudentProfile;
pub use interfaces::TrustLedger;
pub use runtime::Cooldown;
pub use runtime::CooldownSettings;
pub use runtime::Decision;
pub use runtime::DecisionReason;
pub use runtime::EditRequest;
pub use runtime::GateVerifier;
pub use runtime::LifecycleConfig;
pub use runtime::LifecycleError;
pub use runtime::LifecycleManager;
pub use runtime::LogActionRequest;
pub use runtime::LogOutcome;
pub use runtime::MemoryGateLogStore;
pub use runtime::MemoryPolicyStore;
pub use runtime::MemoryRequestStore;
pub use runtime::MemoryStudentDirectory;
pub use runtime::MemoryTrustLedger;
pub use runtime::ProposedWindow;
pub use runtime::ResolveContext;
pub use runtime::ScanTransition;
pub use runtime::SubmitRequest;
pub use runtime::SweepReport;
pub use runtime::VerifyOutcome;
pub use runtime::WeekdayCalendar;
pub use runtime::resolve;
