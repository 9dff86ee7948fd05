use dioxus::prelude::*;
use shared_types::Role;

use crate::auth::use_auth;
use crate::routes::RoleGate;

#[component]
fn Welcome(title: String, blurb: String) -> Element {
    let auth = use_auth();
    let name = auth
        .current_user
        .read()
        .as_ref()
        .map(|u| u.email.clone())
        .unwrap_or_default();

    rsx! {
        div { class: "page",
            h1 { "{title}" }
            p { "Signed in as {name}." }
            p { class: "muted", "{blurb}" }
        }
    }
}

/// Self-service page: own profile and own assessments.
#[component]
pub fn EmployeeLanding() -> Element {
    rsx! {
        RoleGate { required: Role::Employee,
            Welcome {
                title: "My competencies",
                blurb: "Review your job profile and complete your self-assessments.",
            }
        }
    }
}

#[component]
pub fn AssessorLanding() -> Element {
    rsx! {
        RoleGate { required: Role::Assessor,
            Welcome {
                title: "Assessments",
                blurb: "Run consensus assessments for the employees assigned to you.",
            }
        }
    }
}

#[component]
pub fn HrLanding() -> Element {
    rsx! {
        RoleGate { required: Role::Hr,
            Welcome {
                title: "HR administration",
                blurb: "Manage employees, job profiles and competency frameworks.",
            }
        }
    }
}
