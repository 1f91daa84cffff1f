//! # Database module: PostgreSQL identity provider and directory
//!
//! Entirely gated behind `#[cfg(feature = "server")]` so that client builds never
//! pull in SQLx.
//!
//! ## Tables
//!
//! | Table | Owner | Purpose |
//! |-------|-------|---------|
//! | `identities` | [`PgIdentity`] | Email, Argon2 password hash, role hint recorded at sign-up. |
//! | `sessions` | [`PgIdentity`] | Opaque access tokens with an expiry. |
//! | `users` | [`PgDirectory`] | Application-level record written at registration. |
//! | `profiles` | [`PgDirectory`] | Optional profile attributes keyed by user id. |
//! | `clubs` | [`PgDirectory`] | Clubs; `representative_id` drives the representative role. |
//!
//! ## Re-exports
//!
//! - [`connect`]: opens a `PgPool`.
//! - [`migrate`]: runs the embedded migrations.

#[cfg(feature = "server")]
mod pool;
#[cfg(feature = "server")]
mod postgres;

#[cfg(feature = "server")]
pub use pool::{connect, migrate};
#[cfg(feature = "server")]
pub use postgres::{PgDirectory, PgIdentity};
