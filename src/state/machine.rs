use crate::error::TransitionError;
use crate::identity::Principal;
use crate::state::{Application, HistoryAction, HistoryEntry, SlotStatus, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action an administrator takes on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approve => f.write_str("approve"),
            Decision::Reject => f.write_str("reject"),
        }
    }
}

/// Apply one decision to an application and return the next record.
///
/// Pure: the input is left untouched and nothing is persisted. The returned
/// record has its slot, status, history, `last_updated` and `version` all
/// updated together, so committing it is a single write.
///
/// | status                    | role           | approve                   | reject   |
/// |---------------------------|----------------|---------------------------|----------|
/// | pending_block_approval    | block_admin    | pending_district_approval | rejected |
/// | pending_district_approval | district_admin | pending_state_approval    | rejected |
/// | pending_state_approval    | state_admin    | approved                  | rejected |
/// | approved / rejected       | -              | TerminalState             | TerminalState |
pub fn transition(
    app: &Application,
    actor: &Principal,
    decision: Decision,
    remarks: Option<String>,
    now: DateTime<Utc>,
) -> Result<Application, TransitionError> {
    let level = match app.status.pending_level() {
        Some(level) => level,
        None => return Err(TransitionError::TerminalState(app.status)),
    };

    if actor.role() != level.required_role() {
        return Err(TransitionError::InvalidStage {
            status: app.status,
            role: actor.role(),
        });
    }

    let mut next = app.clone();
    match decision {
        Decision::Approve => {
            next.approvals.slot_mut(level).record(
                SlotStatus::Approved,
                actor.id(),
                actor.name(),
                remarks.clone(),
                now,
            );
            next.status = level.next_on_approve();
            if let Some(next_level) = next.status.pending_level() {
                next.approvals.slot_mut(next_level).mark_pending();
            }
        }
        Decision::Reject => {
            next.approvals.slot_mut(level).record(
                SlotStatus::Rejected,
                actor.id(),
                actor.name(),
                remarks.clone(),
                now,
            );
            next.status = Status::Rejected;
        }
    }

    next.approval_history.push(HistoryEntry {
        level: level.into(),
        action: match decision {
            Decision::Approve => HistoryAction::Approved,
            Decision::Reject => HistoryAction::Rejected,
        },
        timestamp: now,
        remarks,
        actor_id: Some(actor.id().to_string()),
    });
    next.last_updated = now;
    next.version = app.version + 1;

    Ok(next)
}
