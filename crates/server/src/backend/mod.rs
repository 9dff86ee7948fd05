//! Client for the hosted backend: auth (GoTrue-style `/auth/v1`) and the
//! row query API (PostgREST-style `/rest/v1`).
//!
//! The auth calls the sign-in flow needs are behind [`AuthBackend`] so the
//! flow can be driven by a fake in tests; role queries go through
//! [`BackendClient::select_eq`] via the role sources in `crate::roles`.

mod client;

pub use client::BackendClient;

use serde::Deserialize;
use shared_types::{Session, UserIdentity};
use std::time::Duration;

/// Errors from a backend call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("config: {0}")]
    Config(String),
}

/// Error codes the auth service puts in a 400 body when a token grant is
/// refused, e.g. a revoked or already rotated refresh token.
const REFUSED_GRANT_CODES: [&str; 2] = ["invalid_grant", "refresh_token_not_found"];

impl BackendError {
    /// True when the backend refused the credentials: any 401/403, or a 400
    /// naming a refused grant. Other 400s are request bugs, not rejections.
    pub fn is_auth_rejection(&self) -> bool {
        match self {
            BackendError::Status {
                status: 401 | 403, ..
            } => true,
            BackendError::Status {
                status: 400,
                message,
            } => REFUSED_GRANT_CODES.iter().any(|code| message.contains(code)),
            _ => false,
        }
    }
}

/// Connection settings, read from the environment.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Project base URL, e.g. `https://abc.example.co`. No trailing slash.
    pub url: String,
    /// Public API key sent as the `apikey` header on every request.
    pub anon_key: String,
    /// HS256 secret the backend signs access tokens with. When set, stored
    /// access tokens are validated locally instead of with a `get user` call.
    pub jwt_secret: Option<String>,
    /// Public origin of this app, used for OAuth `redirect_to`.
    pub site_url: String,
}

impl BackendSettings {
    /// Read `BACKEND_URL`, `BACKEND_ANON_KEY`, `BACKEND_JWT_SECRET` and `SITE_URL`.
    pub fn from_env() -> Result<Self, BackendError> {
        let _ = dotenvy::dotenv();

        let url = std::env::var("BACKEND_URL")
            .map_err(|_| BackendError::Config("BACKEND_URL not set".to_string()))?;
        let anon_key = std::env::var("BACKEND_ANON_KEY")
            .map_err(|_| BackendError::Config("BACKEND_ANON_KEY not set".to_string()))?;
        let jwt_secret = std::env::var("BACKEND_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty());
        let site_url =
            std::env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            jwt_secret,
            site_url: site_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Token grant response shared by the PKCE, refresh and verify endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: UserIdentity,
}

impl TokenResponse {
    pub fn into_session(self, now: i64) -> Session {
        Session {
            expires_at: self.expires_at.unwrap_or(now + self.expires_in),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user: self.user,
        }
    }
}

/// Auth-service calls consumed by the session acquirer.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange an OAuth authorization code plus PKCE verifier for a session.
    async fn exchange_pkce(&self, code: &str, verifier: &str) -> Result<Session, BackendError>;

    /// Verify a one-time token (email confirmation, magic link, recovery).
    async fn verify_otp(&self, token_hash: &str, kind: &str) -> Result<Session, BackendError>;

    /// Trade a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError>;

    /// Look up the user an access token belongs to.
    async fn get_user(&self, access_token: &str) -> Result<UserIdentity, BackendError>;
}
