//! Data models for the application.

mod club;
mod session;
mod user;

pub use club::Club;
pub use session::{AuthEvent, Credentials, ErrorBody, IdentityUser, NewAccount, Session, UserMetadata};
pub use user::{Profile, Role, UnknownRole, User, UserRecord};
