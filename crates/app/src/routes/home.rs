use dioxus::prelude::*;

use crate::routes::Route;

/// Entry point. Asks the server where the caller belongs and goes there:
/// the login page without a session, otherwise the page for their role.
#[component]
pub fn Home() -> Element {
    let resource =
        use_server_future(move || async move { server::api::landing_destination().await })?;

    use_effect(move || {
        let target = match resource.read().as_ref() {
            Some(Ok(destination)) => destination
                .parse::<Route>()
                .unwrap_or(Route::Login { error: None }),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "Landing lookup failed");
                Route::Login { error: None }
            }
            None => return,
        };
        navigator().replace(target);
    });

    let message = if resource.read().is_some() {
        "Redirecting..."
    } else {
        "Loading..."
    };

    rsx! {
        div { class: "page",
            p { class: "muted", "{message}" }
        }
    }
}
