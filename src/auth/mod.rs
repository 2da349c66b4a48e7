//! Principals, roles and the timer control authority check
//!
//! Authentication itself happens upstream; this module only consumes the
//! resulting identity. The server trusts a reverse proxy to stamp each
//! request with `x-user-uid`, `x-user-email` and `x-user-role` headers.

use std::fmt;
use std::str::FromStr;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Membership role of a signed-in principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Regent,
    User,
}

impl Role {
    /// Whether this role may mutate timer state.
    pub fn can_control(self) -> bool {
        matches!(self, Role::Admin | Role::Regent)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "regent" => Ok(Role::Regent),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

/// The signed-in user as seen by the timer core.
///
/// Also doubles as the audit stamp persisted in `lastUpdatedBy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(uid: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            role,
        }
    }
}

/// Decide whether a (possibly absent) principal may mutate timer state.
///
/// Total over its input: an anonymous caller or an unprivileged role simply
/// yields `false`, never an error.
pub fn can_control(user: Option<&Principal>) -> bool {
    user.map(|u| u.role.can_control()).unwrap_or(false)
}

/// Extract the principal from trusted proxy headers, if all three are
/// present and well-formed. Any missing or unparseable piece means the
/// request is treated as anonymous.
pub fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let uid = headers.get("x-user-uid")?.to_str().ok()?;
    let email = headers.get("x-user-email")?.to_str().ok()?;
    let role = headers.get("x-user-role")?.to_str().ok()?.parse().ok()?;
    Some(Principal::new(uid, email, role))
}
