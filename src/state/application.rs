use crate::error::{Error, Result};
use crate::identity::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrative approval level, ordered block < district < state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Block,
    District,
    State,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Block, Level::District, Level::State];

    /// Status an application holds while waiting on this level.
    pub fn pending_status(&self) -> Status {
        match self {
            Level::Block => Status::PendingBlockApproval,
            Level::District => Status::PendingDistrictApproval,
            Level::State => Status::PendingStateApproval,
        }
    }

    /// The only role allowed to decide at this level.
    pub fn required_role(&self) -> Role {
        match self {
            Level::Block => Role::BlockAdmin,
            Level::District => Role::DistrictAdmin,
            Level::State => Role::StateAdmin,
        }
    }

    /// Status reached when this level approves.
    pub fn next_on_approve(&self) -> Status {
        match self {
            Level::Block => Status::PendingDistrictApproval,
            Level::District => Status::PendingStateApproval,
            Level::State => Status::Approved,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Block => "block",
            Level::District => "district",
            Level::State => "state",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative stage marker of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    PendingBlockApproval,
    PendingDistrictApproval,
    PendingStateApproval,
    Approved,
    Rejected,
}

impl Status {
    /// The level whose decision the application is waiting on.
    pub fn pending_level(&self) -> Option<Level> {
        match self {
            Status::PendingBlockApproval => Some(Level::Block),
            Status::PendingDistrictApproval => Some(Level::District),
            Status::PendingStateApproval => Some(Level::State),
            Status::Approved | Status::Rejected => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Approved | Status::Rejected)
    }

    /// Position along the approval pipeline. `Rejected` has no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Status::PendingBlockApproval => Some(0),
            Status::PendingDistrictApproval => Some(1),
            Status::PendingStateApproval => Some(2),
            Status::Approved => Some(3),
            Status::Rejected => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::PendingBlockApproval => "pending_block_approval",
            Status::PendingDistrictApproval => "pending_district_approval",
            Status::PendingStateApproval => "pending_state_approval",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s.trim() {
            "pending_block_approval" => Some(Status::PendingBlockApproval),
            "pending_district_approval" => Some(Status::PendingDistrictApproval),
            "pending_state_approval" => Some(Status::PendingStateApproval),
            "approved" => Some(Status::Approved),
            "rejected" => Some(Status::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Aspirant,
    Business,
}

impl MemberType {
    pub fn parse(s: &str) -> Option<MemberType> {
        match s.trim() {
            "aspirant" => Some(MemberType::Aspirant),
            "business" => Some(MemberType::Business),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Pending,
    Approved,
    Rejected,
}

/// One level's decision record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalSlot {
    pub admin_id: Option<String>,
    pub admin_name: Option<String>,
    pub status: SlotStatus,
    pub remarks: Option<String>,
    pub action_date: Option<DateTime<Utc>>,
}

impl ApprovalSlot {
    pub fn pending() -> Self {
        ApprovalSlot {
            admin_id: None,
            admin_name: None,
            status: SlotStatus::Pending,
            remarks: None,
            action_date: None,
        }
    }

    /// Put the slot back into `pending` without discarding earlier metadata.
    pub fn mark_pending(&mut self) {
        self.status = SlotStatus::Pending;
    }

    pub fn record(
        &mut self,
        status: SlotStatus,
        admin_id: &str,
        admin_name: &str,
        remarks: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.admin_id = Some(admin_id.to_string());
        self.admin_name = Some(admin_name.to_string());
        self.status = status;
        self.remarks = remarks;
        self.action_date = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approvals {
    pub block: ApprovalSlot,
    pub district: ApprovalSlot,
    pub state: ApprovalSlot,
}

impl Approvals {
    pub fn pending() -> Self {
        Approvals {
            block: ApprovalSlot::pending(),
            district: ApprovalSlot::pending(),
            state: ApprovalSlot::pending(),
        }
    }

    pub fn slot(&self, level: Level) -> &ApprovalSlot {
        match level {
            Level::Block => &self.block,
            Level::District => &self.district,
            Level::State => &self.state,
        }
    }

    pub fn slot_mut(&mut self, level: Level) -> &mut ApprovalSlot {
        match level {
            Level::Block => &mut self.block,
            Level::District => &mut self.district,
            Level::State => &mut self.state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryLevel {
    Submitted,
    Block,
    District,
    State,
}

impl From<Level> for HistoryLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Block => HistoryLevel::Block,
            Level::District => HistoryLevel::District,
            Level::State => HistoryLevel::State,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Submitted,
    Approved,
    Rejected,
}

/// Audit trail entry. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub level: HistoryLevel,
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    pub remarks: Option<String>,
    pub actor_id: Option<String>,
}

/// Location captured at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub state: String,
    pub district: String,
    pub block: String,
    pub city: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Membership application aggregate.
///
/// Identity: `application_id`
///
/// Invariants:
/// - `status` only moves forward one stage at a time, or to `rejected`
/// - terminal records (`approved`, `rejected`) accept no further decisions
/// - a completed level's slot agrees with `status`
/// - `approval_history` is append-only
/// - `version` increases by one on every committed mutation
///
/// Authority is always resolved against the location stored here, never
/// against a live lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub application_id: String,
    pub user_id: String,
    pub state: String,
    pub district: String,
    pub block: String,
    pub city: String,
    pub member_type: MemberType,
    pub status: Status,
    pub approvals: Approvals,
    pub approval_history: Vec<HistoryEntry>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_date: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Application {
    /// A freshly submitted application waiting on its block admin.
    pub fn submitted(
        application_id: String,
        user_id: String,
        member_type: MemberType,
        location: Location,
        at: DateTime<Utc>,
    ) -> Self {
        let submitter = user_id.clone();
        Application {
            application_id,
            user_id,
            state: location.state,
            district: location.district,
            block: location.block,
            city: location.city,
            member_type,
            status: Status::PendingBlockApproval,
            approvals: Approvals::pending(),
            approval_history: vec![HistoryEntry {
                level: HistoryLevel::Submitted,
                action: HistoryAction::Submitted,
                timestamp: at,
                remarks: None,
                actor_id: Some(submitter),
            }],
            payment_status: None,
            payment_date: None,
            submitted_at: at,
            last_updated: at,
            version: 0,
        }
    }

    /// Level whose slot recorded the rejection, if the application was rejected.
    pub fn rejected_level(&self) -> Option<Level> {
        if self.status != Status::Rejected {
            return None;
        }
        Level::ALL
            .into_iter()
            .find(|level| self.approvals.slot(*level).status == SlotStatus::Rejected)
    }

    /// Whether the application still blocks the owner from submitting again.
    pub fn is_open(&self) -> bool {
        self.status != Status::Rejected
    }

    /// Record the outcome reported by the payment collaborator.
    ///
    /// Only approved applications may carry a payment.
    pub fn record_payment(&mut self, status: PaymentStatus, at: DateTime<Utc>) -> Result<()> {
        if self.status != Status::Approved {
            return Err(Error::PaymentNotAllowed(self.status));
        }
        self.payment_status = Some(status);
        if status == PaymentStatus::Completed {
            self.payment_date = Some(at);
        }
        self.last_updated = at;
        self.version += 1;
        Ok(())
    }
}
