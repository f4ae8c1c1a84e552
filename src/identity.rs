//! Authenticated principals.
//!
//! A `Principal` is built once per request from claims that an upstream auth
//! collaborator has already verified. It is never mutated afterwards.

use crate::error::{Error, Result};
use crate::state::Level;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    BlockAdmin,
    DistrictAdmin,
    StateAdmin,
    SuperAdmin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::BlockAdmin => "block_admin",
            Role::DistrictAdmin => "district_admin",
            Role::StateAdmin => "state_admin",
            Role::SuperAdmin => "super_admin",
            Role::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim() {
            "block_admin" => Some(Role::BlockAdmin),
            "district_admin" => Some(Role::DistrictAdmin),
            "state_admin" => Some(Role::StateAdmin),
            "super_admin" => Some(Role::SuperAdmin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }

    /// Approval level this role signs off, if it is one of the tiered admins.
    pub fn level(&self) -> Option<Level> {
        match self {
            Role::BlockAdmin => Some(Level::Block),
            Role::DistrictAdmin => Some(Level::District),
            Role::StateAdmin => Some(Level::State),
            Role::SuperAdmin | Role::Member => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        !matches!(self, Role::Member)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic jurisdiction of a principal.
///
/// Only the fields the role uses are ever populated: block admins carry all
/// three, district admins state and district, state admins state only, and
/// super admins and members none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    state: Option<String>,
    district: Option<String>,
    block: Option<String>,
}

impl Scope {
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn district(&self) -> Option<&str> {
        self.district.as_deref()
    }

    pub fn block(&self) -> Option<&str> {
        self.block.as_deref()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.state.is_none() && self.district.is_none() && self.block.is_none()
    }
}

/// Raw claims as carried on an authenticated request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub block: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    id: String,
    name: String,
    role: Role,
    scope: Scope,
}

impl Principal {
    pub fn block_admin(id: &str, name: &str, state: &str, district: &str, block: &str) -> Self {
        Principal {
            id: id.to_string(),
            name: name.to_string(),
            role: Role::BlockAdmin,
            scope: Scope {
                state: Some(state.to_string()),
                district: Some(district.to_string()),
                block: Some(block.to_string()),
            },
        }
    }

    pub fn district_admin(id: &str, name: &str, state: &str, district: &str) -> Self {
        Principal {
            id: id.to_string(),
            name: name.to_string(),
            role: Role::DistrictAdmin,
            scope: Scope {
                state: Some(state.to_string()),
                district: Some(district.to_string()),
                block: None,
            },
        }
    }

    pub fn state_admin(id: &str, name: &str, state: &str) -> Self {
        Principal {
            id: id.to_string(),
            name: name.to_string(),
            role: Role::StateAdmin,
            scope: Scope {
                state: Some(state.to_string()),
                district: None,
                block: None,
            },
        }
    }

    pub fn super_admin(id: &str, name: &str) -> Self {
        Principal {
            id: id.to_string(),
            name: name.to_string(),
            role: Role::SuperAdmin,
            scope: Scope::default(),
        }
    }

    /// A member principal; `user_id` is the owner reference on applications.
    pub fn member(user_id: &str, name: &str) -> Self {
        Principal {
            id: user_id.to_string(),
            name: name.to_string(),
            role: Role::Member,
            scope: Scope::default(),
        }
    }

    /// Build a principal from verified claims.
    ///
    /// The scope fields the role requires must be present and non-blank.
    /// Fields the role does not use are dropped.
    pub fn from_claims(claims: Claims) -> Result<Self> {
        let id = non_blank(Some(claims.id.as_str()), "id")?;
        let role = Role::parse(&claims.role)
            .ok_or_else(|| Error::InvalidClaims(format!("Unknown role '{}'", claims.role)))?;
        let name = claims
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(id)
            .to_string();

        let state = claims.state.as_deref();
        let district = claims.district.as_deref();
        let block = claims.block.as_deref();

        let principal = match role {
            Role::BlockAdmin => Principal::block_admin(
                id,
                &name,
                non_blank(state, "state")?,
                non_blank(district, "district")?,
                non_blank(block, "block")?,
            ),
            Role::DistrictAdmin => Principal::district_admin(
                id,
                &name,
                non_blank(state, "state")?,
                non_blank(district, "district")?,
            ),
            Role::StateAdmin => Principal::state_admin(id, &name, non_blank(state, "state")?),
            Role::SuperAdmin => Principal::super_admin(id, &name),
            Role::Member => Principal::member(id, &name),
        };
        Ok(principal)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

fn non_blank<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::InvalidClaims(format!("Missing '{}' claim", field))),
    }
}
