//! Per-level classification of applications.
//!
//! Dashboards and work queues ask "where does this application stand from my
//! level?". That question is answered here and nowhere else.

use crate::identity::Principal;
use crate::state::{Application, Level, Status};
use serde::{Deserialize, Serialize};

/// Whose point of view a classification is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewpoint {
    Level(Level),
    /// Super admins and members: the pipeline as a whole.
    Global,
}

impl Viewpoint {
    pub fn for_principal(principal: &Principal) -> Self {
        match principal.role().level() {
            Some(level) => Viewpoint::Level(level),
            None => Viewpoint::Global,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    /// Has not reached this level, and may never.
    Upstream,
    /// Waiting on this level's decision.
    Awaiting,
    /// This level signed off (or, globally, the application is approved).
    Passed,
    /// Rejected by this level (or, globally, rejected anywhere).
    Rejected,
}

impl Standing {
    pub fn parse(s: &str) -> Option<Standing> {
        match s.trim() {
            "upstream" => Some(Standing::Upstream),
            "awaiting" => Some(Standing::Awaiting),
            "passed" => Some(Standing::Passed),
            "rejected" => Some(Standing::Rejected),
            _ => None,
        }
    }
}

pub fn classify(app: &Application, viewpoint: Viewpoint) -> Standing {
    match viewpoint {
        Viewpoint::Global => match app.status {
            Status::Approved => Standing::Passed,
            Status::Rejected => Standing::Rejected,
            _ => Standing::Awaiting,
        },
        Viewpoint::Level(mine) => match app.status {
            Status::Approved => Standing::Passed,
            Status::Rejected => match app.rejected_level() {
                Some(at) if at < mine => Standing::Upstream,
                Some(at) if at > mine => Standing::Passed,
                _ => Standing::Rejected,
            },
            pending => match pending.pending_level() {
                Some(at) if at < mine => Standing::Upstream,
                Some(at) if at > mine => Standing::Passed,
                _ => Standing::Awaiting,
            },
        },
    }
}
