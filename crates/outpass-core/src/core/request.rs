// crates/outpass-core/src/core/request.rs
// ============================================================================
// Module: Outpass Pass Request Model
// Description: Pass requests, status machine, and append-only approval events.
// Purpose: Capture the lifecycle state the manager advances and gates consult.
// Dependencies: crate::core::{identifiers, policy, time}, serde
// ============================================================================

//! ## Overview
//! A pass request is one student's time-boxed authorization to leave and
//! re-enter campus. Its status is a closed tagged union; every transition is
//! performed as a conditional write guarded by the expected current status.
//! Approval history is an append-only event log that reconstructs the
//! timeline; it is never mutated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::PassKind;
use crate::core::identifiers::RegNo;
use crate::core::identifiers::RequestId;
use crate::core::policy::ApprovalTier;
use crate::core::policy::StudentCategory;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Pass Status
// ============================================================================

/// Lifecycle status of a pass request.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
/// - `Completed`, `Rejected`, `Cancelled`, and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    /// Submitted, awaiting the first approval tier.
    Pending,
    /// Approved by staff, awaiting the next tier.
    ApprovedStaff,
    /// Approved by the head of department, awaiting the next tier.
    ApprovedHod,
    /// Approved by the warden; fully approved for chains ending at warden.
    ApprovedWarden,
    /// Student has exited campus; awaiting return scan.
    Active,
    /// Pass consumed (one-way exit or completed return).
    Completed,
    /// Rejected by an approval-tier actor.
    Rejected,
    /// Cancelled by the student.
    Cancelled,
    /// Return window elapsed without a terminating scan.
    Expired,
}

impl PassStatus {
    /// Returns the stable string form used by stores and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ApprovedStaff => "approved_staff",
            Self::ApprovedHod => "approved_hod",
            Self::ApprovedWarden => "approved_warden",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved_staff" => Some(Self::ApprovedStaff),
            "approved_hod" => Some(Self::ApprovedHod),
            "approved_warden" => Some(Self::ApprovedWarden),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Reports whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled | Self::Expired)
    }

    /// Returns the status reached after a given tier approves.
    #[must_use]
    pub const fn after_tier(tier: ApprovalTier) -> Self {
        match tier {
            ApprovalTier::Staff => Self::ApprovedStaff,
            ApprovalTier::Hod => Self::ApprovedHod,
            ApprovalTier::Warden => Self::ApprovedWarden,
        }
    }

    /// Returns the last tier reflected by this status, if any.
    #[must_use]
    pub const fn completed_tier(self) -> Option<ApprovalTier> {
        match self {
            Self::ApprovedStaff => Some(ApprovalTier::Staff),
            Self::ApprovedHod => Some(ApprovalTier::Hod),
            Self::ApprovedWarden => Some(ApprovalTier::Warden),
            _ => None,
        }
    }

    /// Reports whether the status reflects full approval for the given chain.
    ///
    /// A request is fully approved once the last tier in the chain has
    /// approved it.
    #[must_use]
    pub fn is_fully_approved(self, chain: &[ApprovalTier]) -> bool {
        match (self.completed_tier(), chain.last()) {
            (Some(done), Some(last)) => done >= *last,
            _ => false,
        }
    }

    /// Returns the tiers still outstanding for the given chain.
    ///
    /// `Pending` owes the whole chain; a partially approved status owes the
    /// tiers strictly after the last completed one. Non-approval statuses
    /// owe nothing.
    #[must_use]
    pub fn outstanding_tiers<'chain>(self, chain: &'chain [ApprovalTier]) -> &'chain [ApprovalTier] {
        match self {
            Self::Pending => chain,
            Self::ApprovedStaff | Self::ApprovedHod | Self::ApprovedWarden => {
                match self.completed_tier() {
                    Some(done) => {
                        let next = chain.iter().position(|tier| *tier > done);
                        next.map_or(&[], |idx| &chain[idx..])
                    }
                    None => &[],
                }
            }
            _ => &[],
        }
    }
}

// ============================================================================
// SECTION: Approval Events
// ============================================================================

/// Stage recorded in the append-only approval timeline.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStage {
    /// Staff tier approved.
    Staff,
    /// HOD tier approved.
    Hod,
    /// Warden tier approved.
    Warden,
    /// Exit scan recorded at the gate.
    Exit,
    /// Return scan recorded at the gate.
    Return,
    /// Request rejected by an approval-tier actor.
    Rejected,
    /// Request cancelled by the student.
    Cancelled,
}

impl ApprovalStage {
    /// Returns the stable string form used by stores and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Hod => "hod",
            Self::Warden => "warden",
            Self::Exit => "exit",
            Self::Return => "return",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "staff" => Some(Self::Staff),
            "hod" => Some(Self::Hod),
            "warden" => Some(Self::Warden),
            "exit" => Some(Self::Exit),
            "return" => Some(Self::Return),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns the stage recorded when a tier approves.
    #[must_use]
    pub const fn from_tier(tier: ApprovalTier) -> Self {
        match tier {
            ApprovalTier::Staff => Self::Staff,
            ApprovalTier::Hod => Self::Hod,
            ApprovalTier::Warden => Self::Warden,
        }
    }
}

/// Append-only approval timeline entry for one request.
///
/// # Invariants
/// - Events are never mutated, only appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    /// Request the event belongs to.
    pub request_id: RequestId,
    /// Timeline stage.
    pub stage: ApprovalStage,
    /// Actor who performed the action.
    pub actor_id: ActorId,
    /// Time the event was recorded.
    pub recorded_at: Timestamp,
    /// Optional actor comments (rejections carry the stated grounds).
    pub comments: Option<String>,
}

// ============================================================================
// SECTION: Pass Request
// ============================================================================

/// One student's time-boxed authorization to leave and re-enter campus.
///
/// # Invariants
/// - A student holds at most one non-terminal request at any time.
/// - `return_at` is `None` only for pass kinds that do not track a return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRequest {
    /// Request identifier assigned by the store.
    pub id: RequestId,
    /// Owning student.
    pub student_id: RegNo,
    /// Student category at submission time.
    pub category: StudentCategory,
    /// Pass kind requested.
    pub pass_kind: PassKind,
    /// Free-text reason supplied by the student.
    pub reason: String,
    /// Planned departure time.
    pub departure_at: Timestamp,
    /// Planned return time; `None` for one-way passes.
    pub return_at: Option<Timestamp>,
    /// Current lifecycle status.
    pub status: PassStatus,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last status change time.
    pub updated_at: Timestamp,
}

/// Fields required to create a new pass request.
///
/// The store assigns the identifier and sets the status to
/// [`PassStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPassRequest {
    /// Owning student.
    pub student_id: RegNo,
    /// Student category at submission time.
    pub category: StudentCategory,
    /// Pass kind requested.
    pub pass_kind: PassKind,
    /// Free-text reason supplied by the student.
    pub reason: String,
    /// Planned departure time.
    pub departure_at: Timestamp,
    /// Planned return time; `None` for one-way passes.
    pub return_at: Option<Timestamp>,
    /// Creation time.
    pub created_at: Timestamp,
}
