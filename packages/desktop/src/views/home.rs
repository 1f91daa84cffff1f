use dioxus::prelude::*;
use ui::{use_auth, use_session, LogoutButton, RoleNav};

use super::ProfileEditor;
use crate::Route;

/// Landing page for a signed-in user.
#[component]
pub fn Home() -> Element {
    let auth = use_auth();
    let session = use_session();
    let nav = use_navigator();

    let state = auth();
    if state.loading && state.user.is_none() {
        return rsx! { p { "Loading..." } };
    }

    let Some(user) = state.user else {
        nav.replace(Route::Login {});
        return rsx! {};
    };

    let name = user.display_name().to_string();
    let role = user.role;

    let refresh = move |_| {
        let session = session.clone();
        async move {
            if let Err(e) = session.refresh_user().await {
                tracing::error!("Failed to refresh user: {}", e);
            }
        }
    };

    rsx! {
        header {
            class: "home-header",
            span { "Signed in as {name} ({role})" }
            button { onclick: refresh, "Refresh" }
            LogoutButton { class: "logout-btn" }
        }
        RoleNav { role }
        ProfileEditor {}
    }
}
