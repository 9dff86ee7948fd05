use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use oauth2::PkceCodeChallenge;
use shared_types::{AppError, OAuthProvider};
use tracing::{error, info};

use super::cookies;
use crate::backend::BackendClient;

/// Build the backend authorize URL for `provider` with a fresh PKCE pair.
/// Returns the URL and the verifier the callback must present.
pub fn begin_authorize(
    backend: &BackendClient,
    provider: OAuthProvider,
) -> Result<(String, String), AppError> {
    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    let url = backend
        .authorize_url(provider.as_str(), challenge.as_str())
        .map_err(|e| {
            error!(error = %e, "Could not build authorize URL");
            AppError::internal("OAuth is misconfigured")
        })?;
    Ok((url, verifier.secret().clone()))
}

/// Axum handler for `/auth/authorize/{provider}`. Sends the browser to the
/// backend's OAuth entry point; the PKCE verifier rides along in a
/// short-lived cookie until `/auth/callback`. Only routed when the `oauth`
/// feature flag is on.
pub async fn authorize(
    State(backend): State<BackendClient>,
    Path(provider_str): Path<String>,
) -> Result<Response, AppError> {
    let provider = OAuthProvider::parse_provider(&provider_str)
        .ok_or_else(|| AppError::bad_request("Unknown OAuth provider"))?;

    let (url, verifier) = begin_authorize(&backend, provider)?;
    info!(provider = provider.as_str(), "Starting OAuth sign-in");

    let mut response = Redirect::to(&url).into_response();
    response
        .headers_mut()
        .append(header::SET_COOKIE, cookies::build_pkce_cookie(&verifier));
    Ok(response)
}
