pub mod home;
pub mod landing;
pub mod login;
pub mod not_found;

use crate::auth::use_auth;
use dioxus::prelude::*;
use shared_types::{AppError, AppErrorKind, Role};

use home::Home;
use landing::{AssessorLanding, EmployeeLanding, HrLanding};
use login::Login;
use not_found::NotFound;

/// Application routes.
#[derive(Clone, Routable, Debug, PartialEq)]
pub enum Route {
    #[route("/")]
    Home {},
    #[route("/login?:error")]
    Login { error: Option<String> },
    #[layout(Shell)]
    #[route("/employee")]
    EmployeeLanding {},
    #[route("/assessor")]
    AssessorLanding {},
    #[route("/hr")]
    HrLanding {},
    #[end_layout]
    #[route("/:..route")]
    NotFound { route: Vec<String> },
}

/// Top bar shared by the role landing pages.
#[component]
fn Shell() -> Element {
    let auth = use_auth();
    let signed_in = auth
        .current_user
        .read()
        .as_ref()
        .map(|u| format!("{} ({})", u.email, u.role.as_str()));

    rsx! {
        header { class: "topbar",
            strong { "Competency Portal" }
            div {
                if let Some(signed_in) = signed_in {
                    span { class: "muted", "{signed_in} " }
                }
                SignOutButton {}
            }
        }
        Outlet::<Route> {}
    }
}

/// Sign-out posts to the server so the session cookies are cleared there.
#[component]
pub fn SignOutButton() -> Element {
    rsx! {
        form { method: "post", action: "/auth/signout",
            button { class: "button", r#type: "submit", "Sign out" }
        }
    }
}

/// Renders `children` only when the signed-in user's role satisfies
/// `required`. Without a session the user is sent to the login page; with a
/// lesser role they are sent back through `/`, which picks their own page.
#[component]
pub fn RoleGate(required: Role, children: Element) -> Element {
    let mut auth = use_auth();

    // `?` propagates RenderError during suspension so Dioxus knows to
    // re-render this component when the server future resolves.
    let resource =
        use_server_future(move || async move { server::api::require_role(required).await })?;

    use_effect(move || match resource.read().as_ref() {
        Some(Ok(user)) => {
            if auth.current_user.peek().as_ref() != Some(user) {
                auth.set_user(user.clone());
            }
        }
        Some(Err(err)) => {
            let forbidden = AppError::from_server_error(&err.to_string())
                .map(|e| e.kind == AppErrorKind::Forbidden)
                .unwrap_or(false);
            if forbidden {
                navigator().replace(Route::Home {});
            } else {
                auth.clear_auth();
                navigator().replace(Route::Login { error: None });
            }
        }
        None => {}
    });

    let allowed = resource.read().as_ref().map(|r| r.is_ok());

    match allowed {
        Some(true) => rsx! { {children} },
        Some(false) => rsx! {
            div { class: "page",
                p { class: "muted", "Redirecting..." }
            }
        },
        None => rsx! {
            div { class: "page",
                p { class: "muted", "Loading..." }
            }
        },
    }
}
