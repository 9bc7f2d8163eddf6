//! Token permission verification

use super::{Authorization, ACTION_READ, ACTION_WRITE, RESOURCE_ORGS, RESOURCE_USERS};
use crate::connection::InfluxApi;
use crate::{Error, Result};

/// The four grants a token needs to manage other credentials
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenPermissions {
    /// `read` on `users`
    pub read_users: bool,
    /// `write` on `users`
    pub write_users: bool,
    /// `read` on `orgs`
    pub read_orgs: bool,
    /// `write` on `orgs`
    pub write_orgs: bool,
}

impl TokenPermissions {
    /// Collect the grants of every authorization whose token equals `token`.
    ///
    /// Matching is exact and case-sensitive. Authorizations without a token
    /// never match.
    pub fn evaluate(authorizations: &[Authorization], token: &str) -> Self {
        let mut perms = Self::default();
        for auth in authorizations
            .iter()
            .filter(|a| a.token.as_deref() == Some(token))
        {
            for p in &auth.permissions {
                perms.read_users |= p.grants(ACTION_READ, RESOURCE_USERS);
                perms.write_users |= p.grants(ACTION_WRITE, RESOURCE_USERS);
                perms.read_orgs |= p.grants(ACTION_READ, RESOURCE_ORGS);
                perms.write_orgs |= p.grants(ACTION_WRITE, RESOURCE_ORGS);
            }
        }
        perms
    }

    /// All four grants are present
    pub fn is_sufficient(&self) -> bool {
        self.read_users && self.write_users && self.read_orgs && self.write_orgs
    }
}

impl std::fmt::Display for TokenPermissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "read-users={}, write-users={}, read-organizations={}, write-organizations={}",
            self.read_users, self.write_users, self.read_orgs, self.write_orgs
        )
    }
}

/// Check that `token` may manage users and organizations.
///
/// # Errors
///
/// [`Error::Introspection`] if the listing cannot be fetched,
/// [`Error::InsufficientPermissions`] if any grant is missing.
pub async fn verify_token<C: InfluxApi>(client: &C, token: &str) -> Result<TokenPermissions> {
    let authorizations = client.authorizations().await.map_err(|e| match e {
        Error::Introspection(_) => e,
        other => Error::Introspection(other.to_string()),
    })?;

    let perms = TokenPermissions::evaluate(&authorizations, token);
    tracing::debug!(
        authorizations = authorizations.len(),
        permissions = %perms,
        "evaluated token permissions"
    );

    if perms.is_sufficient() {
        Ok(perms)
    } else {
        Err(Error::InsufficientPermissions(perms))
    }
}
