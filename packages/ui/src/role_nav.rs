use api::models::Role;
use dioxus::prelude::*;

/// Navigation links for the sections a role may see.
#[component]
pub fn RoleNav(role: Role) -> Element {
    rsx! {
        nav {
            class: "role-nav",
            "data-role": role.as_str(),
            ul {
                for section in role.nav_sections() {
                    li {
                        key: "{section}",
                        class: "role-nav-item",
                        "{section}"
                    }
                }
            }
        }
    }
}
