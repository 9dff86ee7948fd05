use axum::{extract::FromRequestParts, http::request::Parts};
use shared_types::{AppError, AuthUser, Role, Session};

use super::session::SessionRestore;
use crate::state::AppState;

/// Extractor that requires a session. Returns 401 if the auth middleware
/// did not establish one.
pub struct SessionRequired(pub Session);

impl<S: Send + Sync> FromRequestParts<S> for SessionRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(SessionRequired)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// Extractor that optionally extracts the session. Never fails.
pub struct MaybeSession(pub Option<Session>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(parts.extensions.get::<Session>().cloned()))
    }
}

/// How the auth middleware fared with the stored cookies. `None` when it
/// did not run or the request carried no session cookies. Never fails.
pub struct CookieRestore(pub Option<SessionRestore>);

impl<S: Send + Sync> FromRequestParts<S> for CookieRestore {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CookieRestore(parts.extensions.get::<SessionRestore>().copied()))
    }
}

pub const EMPLOYEE: u8 = 0;
pub const ASSESSOR: u8 = 1;
pub const HR: u8 = 2;

fn required_role(role: u8) -> Role {
    match role {
        ASSESSOR => Role::Assessor,
        HR => Role::Hr,
        _ => Role::Employee,
    }
}

/// Extractor that requires a session AND a role that satisfies `ROLE`
/// (one of [`EMPLOYEE`], [`ASSESSOR`], [`HR`]). The role is looked up with
/// a single pass over the role chain; users without an assignment count as
/// employees. Returns 401 if unauthenticated, 403 if the role is too low.
pub struct RoleRequired<const ROLE: u8>(pub AuthUser);

impl<const ROLE: u8> FromRequestParts<AppState> for RoleRequired<ROLE> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let SessionRequired(session) = SessionRequired::from_request_parts(parts, state).await?;
        let user = super::current_user(state, &session).await;

        let required = required_role(ROLE);
        if !user.role.satisfies(&required) {
            return Err(AppError::forbidden(format!(
                "{} role or higher required",
                required.as_str()
            )));
        }

        Ok(RoleRequired(user))
    }
}
