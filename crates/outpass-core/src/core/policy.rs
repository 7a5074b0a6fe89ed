// crates/outpass-core/src/core/policy.rs
// ============================================================================
// Module: Outpass Gate Policy Model
// Description: Per (student category, pass kind) movement rules.
// Purpose: Capture the configurable rules the policy resolver evaluates.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A gate policy describes when a given (student category, pass kind) pair
//! may be used and how gates must scan it: the working-day window, holiday
//! behavior, the required scanning mode, an optional duration cap, the
//! early/overdue grace period, and the ordered approval chain. Policies are
//! pure data plus validation; admin mutation happens through the policy
//! store interface.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::PassKind;
use crate::core::time::TimeError;
use crate::core::time::TimeWindow;

// ============================================================================
// SECTION: Categories and Modes
// ============================================================================

/// Student residency category.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentCategory {
    /// Student who commutes from home daily.
    DayScholar,
    /// Student residing in campus hostels.
    Hostel,
}

impl StudentCategory {
    /// Returns the stable string form used by stores and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DayScholar => "day_scholar",
            Self::Hostel => "hostel",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "day_scholar" => Some(Self::DayScholar),
            "hostel" => Some(Self::Hostel),
            _ => None,
        }
    }
}

/// Behavior of a policy on declared holidays.
///
/// # Invariants
/// - `CustomWindow` requires [`GatePolicy::holiday_window`] to be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayBehavior {
    /// Passes cannot be used on holidays.
    Block,
    /// Passes may be used at any time on holidays.
    Allow,
    /// Passes may be used inside a dedicated holiday window.
    CustomWindow,
}

/// Gate scanning mode mandated by a policy.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateActionMode {
    /// One-way pass: a single exit scan completes the pass.
    ScanExitOnly,
    /// Two-way pass: exit scan activates, return scan completes.
    ScanBoth,
    /// No gate scanning for this pass type.
    NoScan,
    /// Exit through the gate is forbidden for this pass type.
    NoExit,
}

impl GateActionMode {
    /// Reports whether a return scan is expected after exit.
    #[must_use]
    pub const fn expects_return(self) -> bool {
        matches!(self, Self::ScanBoth)
    }

    /// Reports whether the mode permits an exit scan at all.
    #[must_use]
    pub const fn permits_exit(self) -> bool {
        matches!(self, Self::ScanExitOnly | Self::ScanBoth)
    }
}

// ============================================================================
// SECTION: Approval Tiers
// ============================================================================

/// Approval authority tiers, in fixed institutional order.
///
/// # Invariants
/// - The derived ordering (`Staff < Hod < Warden`) matches the fixed
///   institutional chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTier {
    /// Class staff advisor.
    Staff,
    /// Head of department.
    Hod,
    /// Hostel warden.
    Warden,
}

impl ApprovalTier {
    /// Returns the stable string form used by stores and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Hod => "hod",
            Self::Warden => "warden",
        }
    }
}

// ============================================================================
// SECTION: Policy Identity
// ============================================================================

/// Identity of a gate policy: (student category, pass kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyId {
    /// Student category the policy applies to.
    pub category: StudentCategory,
    /// Pass kind the policy applies to.
    pub pass_kind: PassKind,
}

impl PolicyId {
    /// Creates a policy identity.
    #[must_use]
    pub const fn new(category: StudentCategory, pass_kind: PassKind) -> Self {
        Self {
            category,
            pass_kind,
        }
    }
}

// ============================================================================
// SECTION: Gate Policy
// ============================================================================

/// Default early/overdue grace period in minutes.
pub const DEFAULT_GRACE_MINUTES: u32 = 30;

/// Returns the default grace period for deserialization.
const fn default_grace_minutes() -> u32 {
    DEFAULT_GRACE_MINUTES
}

/// Returns the default approval chain for deserialization.
fn default_approval_chain() -> Vec<ApprovalTier> {
    vec![ApprovalTier::Staff, ApprovalTier::Hod, ApprovalTier::Warden]
}

/// Movement rules for one (student category, pass kind) pair.
///
/// # Invariants
/// - `holiday_window` is present iff `holiday_behavior == CustomWindow`.
/// - `approval_chain` is non-empty, strictly ordered, and duplicate-free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Student category the policy applies to.
    pub category: StudentCategory,
    /// Pass kind the policy applies to.
    pub pass_kind: PassKind,
    /// Permitted working-day window; `None` means anytime.
    pub working_window: Option<TimeWindow>,
    /// Behavior on declared holidays.
    pub holiday_behavior: HolidayBehavior,
    /// Window used when `holiday_behavior` is `CustomWindow`.
    pub holiday_window: Option<TimeWindow>,
    /// Gate scanning mode mandated by the policy.
    pub gate_action: GateActionMode,
    /// Optional cap on pass duration in hours.
    pub max_duration_hours: Option<u32>,
    /// Grace period for early exits and overdue returns, in minutes.
    #[serde(default = "default_grace_minutes")]
    pub grace_minutes: u32,
    /// Ordered approval tiers required before the pass becomes usable.
    #[serde(default = "default_approval_chain")]
    pub approval_chain: Vec<ApprovalTier>,
}

impl GatePolicy {
    /// Returns the policy identity.
    #[must_use]
    pub fn id(&self) -> PolicyId {
        PolicyId::new(self.category, self.pass_kind.clone())
    }

    /// Validates policy invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when any invariant is violated.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.pass_kind.as_str().is_empty() {
            return Err(PolicyError::EmptyPassKind);
        }
        if let Some(window) = &self.working_window {
            window.validate()?;
        }
        match (self.holiday_behavior, &self.holiday_window) {
            (HolidayBehavior::CustomWindow, None) => {
                return Err(PolicyError::MissingHolidayWindow);
            }
            (HolidayBehavior::Block | HolidayBehavior::Allow, Some(_)) => {
                return Err(PolicyError::UnexpectedHolidayWindow);
            }
            (HolidayBehavior::CustomWindow, Some(window)) => window.validate()?,
            (HolidayBehavior::Block | HolidayBehavior::Allow, None) => {}
        }
        if let Some(hours) = self.max_duration_hours
            && hours == 0
        {
            return Err(PolicyError::ZeroDurationCap);
        }
        if self.approval_chain.is_empty() {
            return Err(PolicyError::EmptyApprovalChain);
        }
        let ordered = self.approval_chain.windows(2).all(|pair| pair[0] < pair[1]);
        if !ordered {
            return Err(PolicyError::UnorderedApprovalChain);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gate policy validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Pass kind is empty.
    #[error("pass kind must not be empty")]
    EmptyPassKind,
    /// Custom holiday behavior without a holiday window.
    #[error("holiday_window is required when holiday_behavior is custom_window")]
    MissingHolidayWindow,
    /// Holiday window supplied for a non-custom behavior.
    #[error("holiday_window is only valid when holiday_behavior is custom_window")]
    UnexpectedHolidayWindow,
    /// Duration cap of zero hours.
    #[error("max_duration_hours must be greater than zero when set")]
    ZeroDurationCap,
    /// Approval chain is empty.
    #[error("approval_chain must contain at least one tier")]
    EmptyApprovalChain,
    /// Approval chain is out of order or contains duplicates.
    #[error("approval_chain must be strictly ordered staff < hod < warden")]
    UnorderedApprovalChain,
    /// Invalid window bounds.
    #[error(transparent)]
    Window(#[from] TimeError),
}
