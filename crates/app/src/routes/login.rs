use dioxus::prelude::*;
use shared_types::{FeatureFlags, OAuthProvider};

const PROVIDERS: [(OAuthProvider, &str); 3] = [
    (OAuthProvider::Azure, "Microsoft"),
    (OAuthProvider::Google, "Google"),
    (OAuthProvider::GitHub, "GitHub"),
];

fn error_message(code: &str) -> &'static str {
    match code {
        "access_denied" => "Sign-in was cancelled.",
        "server_error" | "temporarily_unavailable" => {
            "The sign-in service is unavailable. Please try again shortly."
        }
        _ => "Sign-in failed. Please try again.",
    }
}

fn authorize_href(provider: OAuthProvider) -> String {
    format!("/auth/authorize/{}", provider.as_str())
}

/// Login page. Provider buttons are full page loads into
/// `/auth/authorize/{provider}`, which hands off to the identity provider.
#[component]
pub fn Login(error: Option<String>) -> Element {
    let flags: FeatureFlags = use_context();

    rsx! {
        div { class: "page",
            h1 { "Sign in" }
            if let Some(message) = error.as_deref().map(error_message) {
                p { class: "error", "{message}" }
            }
            if flags.oauth {
                p { class: "muted", "Continue with your organisation account." }
                div { class: "providers",
                    for (provider, label) in PROVIDERS {
                        a {
                            class: "button",
                            href: authorize_href(provider),
                            "{label}"
                        }
                    }
                }
            } else {
                p { class: "muted",
                    "Open the sign-in link from your invitation email to continue."
                }
            }
        }
    }
}
