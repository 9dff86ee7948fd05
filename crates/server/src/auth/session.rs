//! Session acquisition: turn whatever the caller presented (an OAuth code,
//! a one-time email token, or stored cookies) into a [`Session`].

use axum::http::HeaderMap;
use serde::Deserialize;
use shared_types::Session;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{cookies, jwt};
use crate::backend::{AuthBackend, BackendError};

/// Query parameters the backend appends when it sends the user back.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackQuery {
    /// OAuth authorization code (PKCE flow).
    pub code: Option<String>,
    /// Hashed one-time token from a confirmation, magic-link or recovery email.
    pub token_hash: Option<String>,
    /// One-time token type: `signup`, `email`, `magiclink`, `recovery`, `invite`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// What the caller brought to prove who they are.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionGrant {
    Pkce { code: String, verifier: String },
    OneTimeToken { token_hash: String, kind: String },
    Stored {
        access_token: Option<String>,
        refresh_token: Option<String>,
    },
    /// Already validated upstream (by the auth middleware).
    Established(Session),
}

impl SessionGrant {
    /// Pick the grant for a callback request. An OAuth code without its PKCE
    /// verifier cookie cannot be exchanged and yields `None`, as does a
    /// request carrying nothing at all.
    pub fn from_callback(query: &CallbackQuery, headers: &HeaderMap) -> Option<Self> {
        if let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) {
            let Some(verifier) = cookies::extract_pkce_verifier(headers) else {
                warn!("OAuth code received without a PKCE verifier cookie");
                return None;
            };
            return Some(SessionGrant::Pkce {
                code: code.to_string(),
                verifier,
            });
        }

        if let Some(token_hash) = query.token_hash.as_deref().filter(|t| !t.is_empty()) {
            let kind = query.kind.clone().unwrap_or_else(|| "email".to_string());
            return Some(SessionGrant::OneTimeToken {
                token_hash: token_hash.to_string(),
                kind,
            });
        }

        Self::from_cookies(headers)
    }

    /// Stored session cookies, if any.
    pub fn from_cookies(headers: &HeaderMap) -> Option<Self> {
        let access_token = cookies::extract_access_token(headers);
        let refresh_token = cookies::extract_refresh_token(headers);
        if access_token.is_none() && refresh_token.is_none() {
            return None;
        }
        Some(SessionGrant::Stored {
            access_token,
            refresh_token,
        })
    }
}

/// How restoring a session from the stored cookies went. The auth
/// middleware leaves this in the request extensions whenever it tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRestore {
    Restored,
    /// The backend refused the stored tokens; the cookies are stale.
    Refused,
    /// The backend could not be asked; the cookies may still be good.
    Unavailable,
}

/// A session plus whether it was newly issued by the backend (and so must be
/// written back to the client).
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredSession {
    pub session: Session,
    pub issued: bool,
}

impl AcquiredSession {
    fn issued(session: Session) -> Self {
        Self {
            session,
            issued: true,
        }
    }

    fn existing(session: Session) -> Self {
        Self {
            session,
            issued: false,
        }
    }
}

/// Obtains sessions from the auth service.
pub struct SessionAcquirer {
    auth: Arc<dyn AuthBackend>,
    jwt_secret: Option<String>,
}

impl SessionAcquirer {
    pub fn new(auth: Arc<dyn AuthBackend>, jwt_secret: Option<String>) -> Self {
        Self { auth, jwt_secret }
    }

    /// `Ok(None)` means there is no usable session; errors are transport or
    /// backend failures other than a plain credential rejection.
    pub async fn acquire(&self, grant: SessionGrant) -> Result<Option<AcquiredSession>, BackendError> {
        match grant {
            SessionGrant::Pkce { code, verifier } => {
                debug!("Exchanging OAuth code");
                let session = self.auth.exchange_pkce(&code, &verifier).await?;
                Ok(Some(AcquiredSession::issued(session)))
            }
            SessionGrant::OneTimeToken { token_hash, kind } => {
                debug!(kind = %kind, "Verifying one-time token");
                let session = self.auth.verify_otp(&token_hash, &kind).await?;
                Ok(Some(AcquiredSession::issued(session)))
            }
            SessionGrant::Stored {
                access_token,
                refresh_token,
            } => {
                self.from_stored(access_token.as_deref(), refresh_token.as_deref())
                    .await
            }
            SessionGrant::Established(session) => Ok(Some(AcquiredSession::existing(session))),
        }
    }

    async fn from_stored(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<Option<AcquiredSession>, BackendError> {
        if let Some(access) = access_token {
            if let Some(session) = self.check_access_token(access, refresh_token).await? {
                return Ok(Some(AcquiredSession::existing(session)));
            }
        }

        let Some(refresh) = refresh_token else {
            return Ok(None);
        };

        debug!("Access token missing or expired, refreshing session");
        match self.auth.refresh_session(refresh).await {
            Ok(session) => Ok(Some(AcquiredSession::issued(session))),
            Err(e) if e.is_auth_rejection() => {
                debug!(error = %e, "Refresh token rejected");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// `Ok(None)` when the token is expired or rejected and a refresh should be tried.
    async fn check_access_token(
        &self,
        access: &str,
        refresh_token: Option<&str>,
    ) -> Result<Option<Session>, BackendError> {
        let refresh = refresh_token.unwrap_or_default();
        let now = chrono::Utc::now().timestamp();

        if let Some(secret) = &self.jwt_secret {
            return Ok(jwt::validate_access_token(access, secret)
                .ok()
                .map(|claims| claims.into_session(access, refresh))
                .filter(|session| !session.is_expired(now)));
        }

        let Some(expires_at) =
            jwt::peek_expiry(access).filter(|exp| *exp - Session::EXPIRY_SKEW_SECS > now)
        else {
            return Ok(None);
        };

        match self.auth.get_user(access).await {
            Ok(user) => Ok(Some(Session {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
                expires_at,
                user,
            })),
            Err(e) if e.is_auth_rejection() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
