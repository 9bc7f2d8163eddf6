//! Error types

use crate::auth::TokenPermissions;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the connection producer and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing a required field or could not be decoded
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Certificate material could not be parsed
    #[error("invalid certificate material: {0}")]
    Parse(String),

    /// TLS settings could not be turned into a client configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation attempted before `initialize`
    #[error("connection has not been initialized")]
    NotInitialized,

    /// Dial or liveness probe failed
    #[error("connection error: {0}")]
    Connection(String),

    /// The authorization listing could not be retrieved
    #[error("cannot access authorizations API to check token: {0}")]
    Introspection(String),

    /// The token is valid but lacks one or more required permissions
    #[error("the provided token does not have sufficient permissions: {0}")]
    InsufficientPermissions(TokenPermissions),

    /// Illegal lifecycle transition
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state description
        expected: String,
        /// Actual state
        actual: String,
    },
}

impl Error {
    /// Whether the credential was rejected for lack of permissions
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Error::InsufficientPermissions(_))
    }

    /// Whether a later `connection()` call may succeed without a configuration change.
    ///
    /// Only transport-level failures qualify; everything else needs operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Introspection(_))
    }
}
