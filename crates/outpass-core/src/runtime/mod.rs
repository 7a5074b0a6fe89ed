// crates/outpass-core/src/runtime/mod.rs
// ============================================================================
// Module: Outpass Runtime
// Description: Resolver, lifecycle manager, gate verifier, and memory stores.
// Purpose: Group the decision and orchestration logic over the interfaces.
// Dependencies: crate::runtime submodules
// ============================================================================

//! ## Overview
//! The runtime composes the pure data model with the store interfaces. The
//! resolver is a pure function; the lifecycle manager and gate verifier drive
//! every state transition through conditional writes so concurrent callers
//! cannot corrupt the state machine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod lifecycle;
pub mod resolver;
pub mod store;
pub mod verify;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use lifecycle::Cooldown;
pub use lifecycle::CooldownSettings;
pub use lifecycle::EditRequest;
pub use lifecycle::LifecycleConfig;
pub use lifecycle::LifecycleError;
pub use lifecycle::LifecycleManager;
pub use lifecycle::ScanTransition;
pub use lifecycle::SubmitRequest;
pub use lifecycle::SweepReport;
pub use resolver::Decision;
pub use resolver::DecisionReason;
pub use resolver::ProposedWindow;
pub use resolver::ResolveContext;
pub use resolver::resolve;
pub use store::MemoryGateLogStore;
pub use store::MemoryPolicyStore;
pub use store::MemoryRequestStore;
pub use store::MemoryStudentDirectory;
pub use store::MemoryTrustLedger;
pub use store::WeekdayCalendar;
pub use verify::GateVerifier;
pub use verify::LogActionRequest;
pub use verify::LogOutcome;
pub use verify::VerifyOutcome;
