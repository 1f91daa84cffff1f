//! Authentication context and hooks for the UI.

use std::sync::Arc;

use api::client::HttpAuthClient;
use api::models::{Session, User};
use api::{session_context, SessionHandle, SessionSnapshot};
use dioxus::prelude::*;

/// Session context backed by the HTTP API.
pub type ClientSession = SessionHandle<HttpAuthClient, HttpAuthClient>;

/// Authentication state for the application.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            session: None,
            loading: true,
        }
    }
}

impl From<SessionSnapshot> for AuthState {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            user: snapshot.user,
            session: snapshot.session,
            loading: snapshot.loading,
        }
    }
}

/// Get the current authentication state.
/// Returns a signal that updates whenever the session context publishes.
pub fn use_auth() -> Signal<AuthState> {
    use_context::<Signal<AuthState>>()
}

/// Login, registration, logout and refresh.
pub fn use_session() -> ClientSession {
    use_context::<ClientSession>()
}

/// The HTTP client, for calls outside the session context such as profile edits.
/// Follow a successful edit with `use_session().refresh_user()`.
pub fn use_auth_client() -> Arc<HttpAuthClient> {
    use_context::<Arc<HttpAuthClient>>()
}

/// Provider component that runs the session context.
/// Wrap your app with this component to enable authentication.
#[component]
pub fn AuthProvider(base_url: String, children: Element) -> Element {
    let mut auth_state = use_signal(AuthState::default);

    let client = use_hook(|| Arc::new(HttpAuthClient::new(base_url.clone())));

    let session = use_hook({
        let client = client.clone();
        move || {
            let (handle, driver) = session_context(client.clone(), client);
            spawn(driver.run());

            let mut snapshots = handle.subscribe();
            spawn(async move {
                loop {
                    let snapshot = snapshots.borrow_and_update().clone();
                    tracing::debug!(seq = snapshot.seq, loading = snapshot.loading, "session snapshot");
                    auth_state.set(snapshot.into());
                    if snapshots.changed().await.is_err() {
                        break;
                    }
                }
            });

            handle
        }
    });

    use_context_provider(|| auth_state);
    use_context_provider(|| session);
    use_context_provider(|| client);

    rsx! {
        {children}
    }
}

/// Button to log out the current user.
#[component]
pub fn LogoutButton(
    #[props(default = "Logout".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let session = use_session();
    let mut busy = use_signal(|| false);

    let onclick = move |_| {
        let session = session.clone();
        async move {
            busy.set(true);
            if let Err(e) = session.logout().await {
                tracing::error!("Failed to log out: {}", e);
            }
            busy.set(false);
        }
    };

    rsx! {
        button {
            class: "{class}",
            disabled: busy(),
            onclick: onclick,
            "{label}"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::models::{IdentityUser, Role, UserMetadata};

    #[test]
    fn test_default_state_is_loading() {
        let state = AuthState::default();
        assert!(state.loading);
        assert_eq!(state.user, None);
        assert_eq!(AuthState::from(SessionSnapshot::default()), state);
    }

    #[test]
    fn test_state_mirrors_snapshot() {
        let identity = IdentityUser {
            id: "u1".into(),
            email: "student1@gmail.com".into(),
            metadata: UserMetadata::default(),
        };
        let user = User {
            id: "u1".into(),
            email: "student1@gmail.com".into(),
            role: Role::Student,
            club_id: None,
            profile: None,
        };
        let snapshot = SessionSnapshot {
            seq: 3,
            loading: false,
            session: Some(Session {
                access_token: "t".into(),
                user: identity,
            }),
            user: Some(user.clone()),
        };

        let state = AuthState::from(snapshot);
        assert!(!state.loading);
        assert_eq!(state.user, Some(user));
        assert_eq!(state.session.map(|s| s.access_token), Some("t".to_string()));
    }
}
