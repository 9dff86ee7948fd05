use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use shared_types::landing;
use tracing::{info, warn};

use super::cookies;
use super::extractors::MaybeSession;
use crate::state::AppState;

/// Axum handler for `POST /auth/signout`. Revokes the session at the backend
/// when there is one (failures are logged, not surfaced), clears the
/// session cookies and sends the browser to the login page.
pub async fn sign_out(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Response {
    if let Some(session) = &session {
        match state.backend.sign_out(&session.access_token).await {
            Ok(()) => info!(user_id = %session.user.id, "Signed out"),
            Err(e) => warn!(user_id = %session.user.id, error = %e, "Backend sign-out failed"),
        }
    }

    let mut response = Redirect::to(landing::LOGIN).into_response();
    cookies::clear_session_cookies(response.headers_mut());
    response
}
