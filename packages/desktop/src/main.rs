use dioxus::prelude::*;
use views::{Home, Login, Register};

mod views;

/// Server the app talks to; override at build time with `CLUBY_API_URL`.
const API_URL: &str = match option_env!("CLUBY_API_URL") {
    Some(url) => url,
    None => "http://localhost:8080",
};

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[route("/")]
    Root {},
    #[route("/login")]
    Login {},
    #[route("/register")]
    Register {},
    #[route("/home")]
    Home {},
}

fn main() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        ui::AuthProvider {
            base_url: API_URL,
            Router::<Route> {}
        }
    }
}

#[component]
fn Root() -> Element {
    let auth = ui::use_auth();
    let nav = use_navigator();

    // Redirect based on auth state
    if !auth().loading {
        if auth().user.is_some() {
            nav.replace(Route::Home {});
        } else {
            nav.replace(Route::Login {});
        }
    }

    rsx! {}
}
