use axum::{
    routing::{get, post},
    Router,
};
use shared_types::{
    AppError, AppErrorKind, AuthUser, FeatureFlags, LandingResponse, ResolvedRole, Role,
    RoleSourceKind,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::auth::{callback, oauth, signout};
use crate::health;
use crate::rest;
use crate::state::AppState;

/// OpenAPI documentation for the API.
#[derive(OpenApi)]
#[openapi(
    paths(
        rest::auth::landing,
        rest::auth::me,
        rest::auth::employee_landing,
        rest::auth::assessor_landing,
        rest::auth::hr_landing,
        health::health_check,
    ),
    components(schemas(
        AppError,
        AppErrorKind,
        AuthUser,
        LandingResponse,
        ResolvedRole,
        Role,
        RoleSourceKind,
        health::HealthResponse,
    )),
    tags(
        (name = "auth", description = "Session landing and identity"),
        (name = "landing", description = "Role-gated landing page access"),
        (name = "health", description = "Health check")
    )
)]
pub struct ApiDoc;

/// Build an Axum router that serves the API docs at `/docs`, the REST API
/// at `/api/v1/*` and the browser-facing `/auth/*` endpoints.
///
/// The auth middleware is layered by the caller, over this router and the
/// Dioxus one together.
pub fn api_router(state: AppState, flags: &FeatureFlags) -> Router {
    let mut router = Router::new()
        .merge(rest::api_router())
        .route("/health", get(health::health_check))
        .route("/auth/callback", get(callback::auth_callback))
        .route("/auth/signout", post(signout::sign_out));

    if flags.oauth {
        router = router.route("/auth/authorize/{provider}", get(oauth::authorize));
    }

    router
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
}
