//! This crate contains all shared UI for the workspace.

mod auth;
pub use auth::{
    use_auth, use_auth_client, use_session, AuthProvider, AuthState, ClientSession, LogoutButton,
};

mod role_nav;
pub use role_nav::RoleNav;
