//! Authentication: provider interfaces, credentials, tokens and registration.

mod config;
mod password;
mod provider;
mod registration;
mod session;

pub use config::{AuthConfig, DEFAULT_ADMIN_EMAIL_SUFFIX};
pub use password::{hash_password, verify_password};
pub use provider::{IdentityAdmin, IdentityProvider, AUTH_EVENT_CAPACITY};
pub use registration::{normalize_account, register_account, MIN_PASSWORD_LEN};
pub use session::{bearer_token, generate_access_token, AUTHORIZATION_SCHEME};
