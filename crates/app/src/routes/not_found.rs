use dioxus::prelude::*;

use crate::routes::Route;

/// 404 Not Found page.
#[component]
pub fn NotFound(route: Vec<String>) -> Element {
    let path = format!("/{}", route.join("/"));

    rsx! {
        div { class: "page",
            h1 { "Page Not Found" }
            p { class: "muted",
                "The page "
                code { "{path}" }
                " could not be found."
            }
            Link { to: Route::Home {}, class: "button", "Back to start" }
        }
    }
}
