//! Error taxonomy for authentication, lookups and registration.

use thiserror::Error;

/// Failures talking to the identity provider or the session context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    AccountExists,

    #[error("Session expired or revoked")]
    SessionExpired,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Session context is no longer running")]
    Closed,
}

/// A directory read failed. The reconciler treats the row as absent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{table} lookup failed: {message}")]
pub struct LookupError {
    pub table: &'static str,
    pub message: String,
}

impl LookupError {
    pub fn new(table: &'static str, message: impl Into<String>) -> Self {
        Self {
            table,
            message: message.into(),
        }
    }
}

/// A directory write failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{table} write failed: {message}")]
pub struct StoreError {
    pub table: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(table: &'static str, message: impl Into<String>) -> Self {
        Self {
            table,
            message: message.into(),
        }
    }
}

/// Account registration failures, surfaced to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("{0}")]
    Invalid(String),

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Could not create identity: {0}")]
    Identity(#[source] AuthError),

    /// The user record could not be written; the identity was deleted again.
    #[error("Could not create user record: {0}")]
    Record(#[source] StoreError),

    /// The user record could not be written and deleting the identity failed too.
    #[error("Registration left identity {user_id} without a user record: {cause}")]
    Orphaned { user_id: String, cause: StoreError },
}
