//! Session reconciliation: turning an identity-provider session into a [`User`].
//!
//! - [`resolve_role`]: the fixed role precedence, as a pure function.
//! - [`AccountService`] / [`DirectoryAccounts`]: one reconciliation pass (identity,
//!   profile lookup, club lookup) plus account registration.
//! - [`session_context`]: the single-writer task that serializes passes and publishes
//!   [`SessionSnapshot`]s to subscribers.
//!
//! [`User`]: crate::models::User

mod accounts;
mod context;
mod role;

pub use accounts::{AccountService, DirectoryAccounts};
pub use context::{session_context, SessionDriver, SessionHandle, SessionSnapshot};
pub use role::resolve_role;
