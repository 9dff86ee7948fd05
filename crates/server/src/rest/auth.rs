use axum::{extract::State, Json};
use shared_types::{AppError, AuthUser, LandingResponse};

use crate::auth::callback::landing_now;
use crate::auth::extractors::{MaybeSession, RoleRequired, SessionRequired, ASSESSOR, EMPLOYEE, HR};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /api/v1/auth/landing
// ---------------------------------------------------------------------------

/// Where the caller's session should land. Callers without a session get
/// the login path rather than an error.
#[utoipa::path(
    get,
    path = "/api/v1/auth/landing",
    responses(
        (status = 200, description = "Landing path for the current session", body = LandingResponse)
    ),
    tag = "auth"
)]
pub async fn landing(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Json<LandingResponse> {
    let destination = landing_now(&state, session.as_ref()).await;
    Json(LandingResponse { destination })
}

// ---------------------------------------------------------------------------
// GET /api/v1/me
// ---------------------------------------------------------------------------

/// Identity and resolved role of the caller.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current user", body = AuthUser),
        (status = 401, description = "No session", body = AppError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    SessionRequired(session): SessionRequired,
) -> Json<AuthUser> {
    Json(crate::auth::current_user(&state, &session).await)
}

// ---------------------------------------------------------------------------
// GET /api/v1/landing/{employee,assessor,hr}
// ---------------------------------------------------------------------------

/// Access check for the employee landing page.
#[utoipa::path(
    get,
    path = "/api/v1/landing/employee",
    responses(
        (status = 200, description = "Caller may open the employee landing page", body = AuthUser),
        (status = 401, description = "No session", body = AppError)
    ),
    tag = "landing"
)]
pub async fn employee_landing(RoleRequired(user): RoleRequired<EMPLOYEE>) -> Json<AuthUser> {
    Json(user)
}

/// Access check for the assessor landing page.
#[utoipa::path(
    get,
    path = "/api/v1/landing/assessor",
    responses(
        (status = 200, description = "Caller may open the assessor landing page", body = AuthUser),
        (status = 401, description = "No session", body = AppError),
        (status = 403, description = "Role too low", body = AppError)
    ),
    tag = "landing"
)]
pub async fn assessor_landing(RoleRequired(user): RoleRequired<ASSESSOR>) -> Json<AuthUser> {
    Json(user)
}

/// Access check for the HR landing page.
#[utoipa::path(
    get,
    path = "/api/v1/landing/hr",
    responses(
        (status = 200, description = "Caller may open the HR landing page", body = AuthUser),
        (status = 401, description = "No session", body = AppError),
        (status = 403, description = "Role too low", body = AppError)
    ),
    tag = "landing"
)]
pub async fn hr_landing(RoleRequired(user): RoleRequired<HR>) -> Json<AuthUser> {
    Json(user)
}
