use axum::response::Redirect;
use shared_types::{landing, ResolvedRole, Role};

/// Landing path for a resolved role. Unknown role names and users with no
/// role at all land on the employee page.
pub fn landing_for(resolved: Option<&ResolvedRole>) -> &'static str {
    let role = resolved.and_then(ResolvedRole::role).unwrap_or(Role::Employee);
    landing::for_role(role)
}

/// 303 redirect to `destination`. The browser replaces the callback URL, so
/// Back does not return to it.
pub fn dispatch(destination: &str) -> Redirect {
    Redirect::to(destination)
}
