//! Registration page view with email/password form and role choice.

use api::auth::MIN_PASSWORD_LEN;
use api::Role;
use dioxus::prelude::*;
use ui::{use_auth, use_session};

use crate::Route;

#[component]
pub fn Register() -> Element {
    let auth = use_auth();
    let session = use_session();
    let nav = use_navigator();
    let mut name = use_signal(String::new);
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut confirm_password = use_signal(String::new);
    let mut role = use_signal(Role::default);
    let mut error = use_signal(|| Option::<String>::None);
    let mut loading = use_signal(|| false);

    // Home is reached once the SignedIn event after registration has been reconciled.
    if !auth().loading && auth().user.is_some() {
        nav.replace(Route::Home {});
    }

    let handle_register = move |evt: FormEvent| {
        evt.prevent_default();
        let session = session.clone();
        spawn(async move {
            error.set(None);

            let n = name().trim().to_string();
            let e = email().trim().to_string();
            let p = password();

            if p != confirm_password() {
                error.set(Some("Passwords do not match".to_string()));
                return;
            }

            loading.set(true);
            let result = match session.register(&n, &e, &p, role()).await {
                Ok(()) => session.login(&e, &p).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            loading.set(false);

            if let Err(e) = result {
                error.set(Some(e));
            }
        });
    };

    rsx! {
        div {
            class: "auth-page",

            h1 { "Create Account" }
            p { "Sign up for Cluby" }

            form {
                onsubmit: handle_register,
                class: "auth-form",

                if let Some(err) = error() {
                    div { class: "auth-error", "{err}" }
                }

                input {
                    r#type: "text",
                    placeholder: "Name",
                    value: name(),
                    oninput: move |evt: FormEvent| name.set(evt.value()),
                }

                input {
                    r#type: "email",
                    placeholder: "Email",
                    value: email(),
                    oninput: move |evt: FormEvent| email.set(evt.value()),
                }

                input {
                    r#type: "password",
                    placeholder: "Password (min {MIN_PASSWORD_LEN} characters)",
                    value: password(),
                    oninput: move |evt: FormEvent| password.set(evt.value()),
                }

                input {
                    r#type: "password",
                    placeholder: "Confirm password",
                    value: confirm_password(),
                    oninput: move |evt: FormEvent| confirm_password.set(evt.value()),
                }

                select {
                    value: role().as_str(),
                    onchange: move |evt: FormEvent| {
                        if let Ok(parsed) = evt.value().parse::<Role>() {
                            role.set(parsed);
                        }
                    },
                    option { value: Role::Student.as_str(), "Student" }
                    option { value: Role::ClubRepresentative.as_str(), "Club representative" }
                }

                button {
                    r#type: "submit",
                    disabled: loading(),
                    if loading() { "Creating account..." } else { "Sign up" }
                }
            }

            p {
                "Already have an account? "
                Link { to: Route::Login {}, "Sign in" }
            }
        }
    }
}
