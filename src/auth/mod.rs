//! Authorization records and token permission checks
//!
//! This module handles:
//! * The authorization listing returned by `/api/v2/authorizations`
//! * Deciding whether a token may manage users and organizations

mod verify;

pub use verify::{verify_token, TokenPermissions};

use serde::{Deserialize, Serialize};

/// Action granting read access
pub const ACTION_READ: &str = "read";
/// Action granting write access
pub const ACTION_WRITE: &str = "write";
/// Resource type for users
pub const RESOURCE_USERS: &str = "users";
/// Resource type for organizations
pub const RESOURCE_ORGS: &str = "orgs";

/// One page of the authorization listing
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthorizationList {
    /// Authorizations visible to the calling token
    #[serde(default)]
    pub authorizations: Vec<Authorization>,
}

/// A token and the permissions granted to it
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Authorization {
    /// Authorization ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Token value; absent when the server does not disclose it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// `active` or `inactive`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Owning organization ID
    #[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Granted permissions
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Authorization {
    /// Authorization for `token` with the given permissions
    pub fn new(token: impl Into<String>, permissions: Vec<Permission>) -> Self {
        Self {
            token: Some(token.into()),
            permissions,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorization")
            .field("id", &self.id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("status", &self.status)
            .field("org_id", &self.org_id)
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// An (action, resource) grant
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Permission {
    /// `read` or `write`
    pub action: String,
    /// Resource the action applies to
    pub resource: Resource,
}

impl Permission {
    /// Grant `action` on every resource of `kind`
    pub fn new(action: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: Resource {
                kind: kind.into(),
                id: None,
                org_id: None,
            },
        }
    }

    fn grants(&self, action: &str, kind: &str) -> bool {
        self.action == action && self.resource.kind == kind
    }
}

/// Resource selector within a permission
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Resource {
    /// Resource type, e.g. `users` or `orgs`
    #[serde(rename = "type")]
    pub kind: String,
    /// Specific resource ID, if scoped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Organization scope, if any
    #[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}
