use dioxus::prelude::*;
use shared_types::{AuthUser, FeatureFlags, Role};

#[cfg(feature = "server")]
use crate::error_convert::{AppErrorExt, BackendErrorExt};

// ── Session helpers for server functions ──────────────────

/// Session for the current request. Reads the one the auth middleware put in
/// the request extensions and falls back to the session cookies when the
/// middleware did not run. Rotated tokens from that fallback are not written
/// back; the middleware does that on the next request.
#[cfg(feature = "server")]
async fn current_session() -> Result<Option<shared_types::Session>, ServerFnError> {
    use crate::auth::session::SessionGrant;

    let Some(ctx) = dioxus::fullstack::FullstackContext::current() else {
        return Ok(None);
    };

    let headers = {
        let parts = ctx.parts_mut();
        if let Some(session) = parts.extensions.get::<shared_types::Session>() {
            return Ok(Some(session.clone()));
        }
        parts.headers.clone()
    };

    let Some(grant) = SessionGrant::from_cookies(&headers) else {
        return Ok(None);
    };

    let state = crate::state::app_state().map_err(|e| e.into_app_error().into_server_fn_error())?;
    let acquired = state
        .sessions
        .acquire(grant)
        .await
        .map_err(|e| e.into_app_error().into_server_fn_error())?;
    Ok(acquired.map(|a| a.session))
}

/// Get the current feature flags. No auth required; flags are not sensitive.
#[server]
pub async fn get_feature_flags() -> Result<FeatureFlags, ServerFnError> {
    Ok(crate::config::feature_flags().clone())
}

/// The signed-in user with their resolved role, or `None` without a session.
#[cfg_attr(feature = "server", tracing::instrument)]
#[server]
pub async fn current_user() -> Result<Option<AuthUser>, ServerFnError> {
    let Some(session) = current_session().await? else {
        return Ok(None);
    };
    let state = crate::state::app_state().map_err(|e| e.into_app_error().into_server_fn_error())?;
    Ok(Some(crate::auth::current_user(state, &session).await))
}

/// Landing path for the current caller: the login page without a session,
/// otherwise the page for their role. Never fails on role lookup problems.
#[cfg_attr(feature = "server", tracing::instrument)]
#[server]
pub async fn landing_destination() -> Result<String, ServerFnError> {
    let session = current_session().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Session lookup failed, sending to login");
        None
    });
    let state = crate::state::app_state().map_err(|e| e.into_app_error().into_server_fn_error())?;
    Ok(crate::auth::callback::landing_now(state, session.as_ref()).await)
}

/// Gate for a landing page: the current user if their role satisfies
/// `required`, otherwise an Unauthorized or Forbidden error.
#[cfg_attr(feature = "server", tracing::instrument)]
#[server]
pub async fn require_role(required: Role) -> Result<AuthUser, ServerFnError> {
    use shared_types::AppError;

    let session = current_session()
        .await?
        .ok_or_else(|| AppError::unauthorized("Authentication required").into_server_fn_error())?;
    let state = crate::state::app_state().map_err(|e| e.into_app_error().into_server_fn_error())?;
    let user = crate::auth::current_user(state, &session).await;

    if !user.role.satisfies(&required) {
        return Err(AppError::forbidden(format!(
            "{} role or higher required",
            required.as_str()
        ))
        .into_server_fn_error());
    }
    Ok(user)
}
