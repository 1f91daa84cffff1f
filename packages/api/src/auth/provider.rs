//! Identity-provider interface.
//!
//! The session context only needs the user-facing half ([`IdentityProvider`]).
//! Backends that own the credential store also implement [`IdentityAdmin`], which
//! registration uses to create accounts and to undo them when a later step fails.

use std::future::Future;

use tokio::sync::broadcast;

use crate::error::AuthError;
use crate::models::{AuthEvent, IdentityUser, NewAccount, Session};

/// Capacity of the auth-event broadcast channel every provider owns.
pub const AUTH_EVENT_CAPACITY: usize = 16;

/// Async interface to an identity/session provider.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Establish a session. Implementations emit [`AuthEvent::SignedIn`] on success.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, AuthError>> + Send;

    /// Invalidate the session behind `access_token` and emit [`AuthEvent::SignedOut`].
    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// The provider's persisted session, if any.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send;

    /// Look up the user behind an access token. `Ok(None)` means the token is unknown
    /// or expired.
    fn get_user(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Option<IdentityUser>, AuthError>> + Send;

    /// Subscribe to auth-state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Account management on providers that own credentials.
pub trait IdentityAdmin: Send + Sync + 'static {
    /// Create an identity with `account.role` recorded in its metadata.
    /// Fails with [`AuthError::AccountExists`] if the email is already taken.
    fn sign_up(
        &self,
        account: &NewAccount,
    ) -> impl Future<Output = Result<IdentityUser, AuthError>> + Send;

    /// Remove an identity and all of its sessions.
    fn delete_user(&self, user_id: &str) -> impl Future<Output = Result<(), AuthError>> + Send;
}
