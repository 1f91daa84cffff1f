//! Profile editor for the signed-in user.

use api::models::Profile;
use dioxus::prelude::*;
use ui::{use_auth, use_auth_client, use_session};

/// Empty inputs are stored as absent fields.
fn optional(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[component]
pub fn ProfileEditor() -> Element {
    let auth = use_auth();
    let client = use_auth_client();
    let session = use_session();

    let current = auth().user.and_then(|u| u.profile).unwrap_or_default();
    let mut full_name = use_signal(|| current.full_name.clone().unwrap_or_default());
    let mut department = use_signal(|| current.department.clone().unwrap_or_default());
    let mut year = use_signal(|| current.year.map(|y| y.to_string()).unwrap_or_default());
    let mut bio = use_signal(|| current.bio.clone().unwrap_or_default());
    let mut status = use_signal(|| Option::<String>::None);
    let mut saving = use_signal(|| false);

    let handle_save = move |evt: FormEvent| {
        evt.prevent_default();
        let client = client.clone();
        let session = session.clone();
        let avatar_url = auth().user.and_then(|u| u.profile).and_then(|p| p.avatar_url);
        spawn(async move {
            let year = match year().trim() {
                "" => None,
                raw => match raw.parse::<i32>() {
                    Ok(year) => Some(year),
                    Err(_) => {
                        status.set(Some("Year must be a number".to_string()));
                        return;
                    }
                },
            };
            let profile = Profile {
                full_name: optional(full_name()),
                avatar_url,
                department: optional(department()),
                year,
                bio: optional(bio()),
            };

            saving.set(true);
            match client.update_profile(&profile).await {
                Ok(_) => {
                    // The session context owns the published user; let it re-resolve.
                    if let Err(e) = session.refresh_user().await {
                        tracing::error!("Failed to refresh user: {}", e);
                    }
                    status.set(Some("Profile saved".to_string()));
                }
                Err(e) => status.set(Some(e.to_string())),
            }
            saving.set(false);
        });
    };

    rsx! {
        form {
            onsubmit: handle_save,
            class: "profile-form",

            if let Some(message) = status() {
                div { class: "profile-status", "{message}" }
            }

            input {
                r#type: "text",
                placeholder: "Full name",
                value: full_name(),
                oninput: move |evt: FormEvent| full_name.set(evt.value()),
            }
            input {
                r#type: "text",
                placeholder: "Department",
                value: department(),
                oninput: move |evt: FormEvent| department.set(evt.value()),
            }
            input {
                r#type: "number",
                placeholder: "Year",
                value: year(),
                oninput: move |evt: FormEvent| year.set(evt.value()),
            }
            textarea {
                placeholder: "Bio",
                value: bio(),
                oninput: move |evt: FormEvent| bio.set(evt.value()),
            }

            button {
                r#type: "submit",
                disabled: saving(),
                if saving() { "Saving..." } else { "Save profile" }
            }
        }
    }
}
