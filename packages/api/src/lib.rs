//! # API crate: session reconciliation core for Cluby
//!
//! Everything the frontends and the server share about who the current user is.
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`auth`] | | Identity-provider traits, Argon2 password hashing, access tokens, admin-domain policy, compensating registration |
//! | [`client`] | `client` | `reqwest` backend: the session context over the server's HTTP API |
//! | [`db`] | `server` | PostgreSQL identity provider and directory, pool and migrations |
//! | [`directory`] | | The datastore trait: profile and club lookups, user-record and profile writes |
//! | [`error`] | | `AuthError`, `LookupError`, `StoreError`, `RegistrationError` |
//! | [`memory`] | | In-memory identity provider and directory for tests and local development |
//! | [`models`] | | `User`, `Role`, `Profile`, `Session`, `AuthEvent` and friends |
//! | [`reconcile`] | | Role resolution, reconciliation passes, and the single-writer session context |
//!
//! ## Role precedence
//!
//! A pass resolves the role from scratch: a club naming the user as representative wins,
//! then the reserved admin email suffix, then the role hint recorded at sign-up, then
//! `student`. See [`reconcile::resolve_role`].

pub mod auth;
#[cfg(feature = "client")]
pub mod client;
pub mod db;
pub mod directory;
pub mod error;
pub mod memory;
pub mod models;
pub mod reconcile;

pub use error::{AuthError, LookupError, RegistrationError, StoreError};
pub use models::{Profile, Role, Session, User};
pub use reconcile::{session_context, SessionHandle, SessionSnapshot};
