pub mod auth;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Build the REST API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/landing", get(auth::landing))
        .route("/api/v1/me", get(auth::me))
        .route("/api/v1/landing/employee", get(auth::employee_landing))
        .route("/api/v1/landing/assessor", get(auth::assessor_landing))
        .route("/api/v1/landing/hr", get(auth::hr_landing))
}
