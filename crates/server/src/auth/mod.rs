pub mod callback;
pub mod cookies;
pub mod extractors;
pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod session;
pub mod signout;

use shared_types::{AuthUser, Role, Session};

use crate::state::AppState;

/// Identity plus role for an established session. Users without any role
/// assignment are reported as employees with no role source.
pub async fn current_user(state: &AppState, session: &Session) -> AuthUser {
    let resolved = state.resolver.resolve_now(session).await;
    AuthUser {
        id: session.user.id.clone(),
        email: session.user.email.clone(),
        role: resolved
            .as_ref()
            .map(|r| Role::from_name_or_default(&r.name))
            .unwrap_or_default(),
        role_source: resolved.map(|r| r.source),
    }
}
