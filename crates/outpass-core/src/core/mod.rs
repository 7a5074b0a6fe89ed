// crates/outpass-core/src/core/mod.rs
// ============================================================================
// Module: Outpass Core Data Model
// Description: Identifiers, time, policies, trust, requests, and gate records.
// Purpose: Group the pure data types shared across the Outpass runtime.
// Dependencies: crate::core submodules
// ============================================================================

//! ## Overview
//! Pure data types with validation and no I/O. Everything here is
//! deterministic and serializable; hosts supply timestamps explicitly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod gate;
pub mod identifiers;
pub mod policy;
pub mod request;
pub mod time;
pub mod trust;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use gate::CacheSnapshot;
pub use gate::GateAction;
pub use gate::GateLog;
pub use gate::GateStatus;
pub use gate::LogSource;
pub use gate::PassSummary;
pub use gate::SnapshotRecord;
pub use identifiers::ActorId;
pub use identifiers::PassKind;
pub use identifiers::RegNo;
pub use identifiers::RequestId;
pub use policy::ApprovalTier;
pub use policy::DEFAULT_GRACE_MINUTES;
pub use policy::GateActionMode;
pub use policy::GatePolicy;
pub use policy::HolidayBehavior;
pub use policy::PolicyError;
pub use policy::PolicyId;
pub use policy::StudentCategory;
pub use request::ApprovalEvent;
pub use request::ApprovalStage;
pub use request::NewPassRequest;
pub use request::PassRequest;
pub use request::PassStatus;
pub use time::CivilTime;
pub use time::DayKind;
pub use time::TimeError;
pub use time::TimeOfDay;
pub use time::TimeWindow;
pub use time::Timestamp;
pub use trust::TrustError;
pub use trust::TrustEvent;
pub use trust::TrustReason;
pub use trust::TrustSettings;
pub use trust::derive_score;
pub use trust::is_blocked;
