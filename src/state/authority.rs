//! Jurisdiction resolution.
//!
//! `visibility` turns a principal into a query predicate, and `can_act` is
//! that same predicate restricted to administrators. Sharing one predicate
//! keeps listings, statistics and mutations on the same jurisdiction model.
//! Neither function looks at the workflow stage; that is the state machine's
//! concern.

use crate::identity::{Principal, Role};
use crate::state::Application;
use serde::Serialize;

/// Which applications a principal may observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Visibility {
    All,
    State {
        state: String,
    },
    District {
        state: String,
        district: String,
    },
    Block {
        state: String,
        district: String,
        block: String,
    },
    Owner {
        user_id: String,
    },
    /// Admin principal without the scope its role requires.
    Nothing,
}

impl Visibility {
    pub fn matches(&self, app: &Application) -> bool {
        match self {
            Visibility::All => true,
            Visibility::State { state } => app.state == *state,
            Visibility::District { state, district } => {
                app.state == *state && app.district == *district
            }
            Visibility::Block {
                state,
                district,
                block,
            } => app.state == *state && app.district == *district && app.block == *block,
            Visibility::Owner { user_id } => app.user_id == *user_id,
            Visibility::Nothing => false,
        }
    }
}

/// Resolve the visibility predicate for a principal.
pub fn visibility(principal: &Principal) -> Visibility {
    let scope = principal.scope();
    match principal.role() {
        Role::SuperAdmin => Visibility::All,
        Role::StateAdmin => match scope.state() {
            Some(state) => Visibility::State {
                state: state.to_string(),
            },
            None => Visibility::Nothing,
        },
        Role::DistrictAdmin => match (scope.state(), scope.district()) {
            (Some(state), Some(district)) => Visibility::District {
                state: state.to_string(),
                district: district.to_string(),
            },
            _ => Visibility::Nothing,
        },
        Role::BlockAdmin => match (scope.state(), scope.district(), scope.block()) {
            (Some(state), Some(district), Some(block)) => Visibility::Block {
                state: state.to_string(),
                district: district.to_string(),
                block: block.to_string(),
            },
            _ => Visibility::Nothing,
        },
        Role::Member => Visibility::Owner {
            user_id: principal.id().to_string(),
        },
    }
}

/// Whether `principal` has jurisdiction to decide on `app`.
///
/// Members never do, even on their own applications.
pub fn can_act(principal: &Principal, app: &Application) -> bool {
    if !principal.role().is_admin() {
        return false;
    }
    visibility(principal).matches(app)
}
