//! The post-authentication flow: obtain a session, look up the user's role,
//! send them to the matching landing page.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use shared_types::{landing, ResolvedRole, Session};
use tracing::{error, info, warn};

use super::cookies;
use super::extractors::{CookieRestore, MaybeSession};
use super::session::{AcquiredSession, CallbackQuery, SessionGrant};
use crate::redirect;
use crate::state::AppState;

/// Where a sign-in attempt ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct SignInOutcome {
    pub destination: String,
    /// `None` when no session could be obtained.
    pub session: Option<AcquiredSession>,
    /// `None` when there was no session or no source had a role row.
    pub role: Option<ResolvedRole>,
    /// The backend refused the presented credentials, as opposed to being
    /// unreachable. Only then are stored session cookies worth clearing.
    pub credentials_refused: bool,
}

impl SignInOutcome {
    fn login() -> Self {
        Self {
            destination: landing::LOGIN.to_string(),
            session: None,
            role: None,
            credentials_refused: false,
        }
    }

    fn refused() -> Self {
        Self {
            credentials_refused: true,
            ..Self::login()
        }
    }
}

/// Run the flow for one grant. Without a session the caller goes to the
/// login page and no role source is queried.
#[tracing::instrument(skip_all)]
pub async fn run_sign_in(state: &AppState, grant: Option<SessionGrant>) -> SignInOutcome {
    let Some(grant) = grant else {
        info!("No session grant presented");
        return SignInOutcome::login();
    };

    let acquired = match state.sessions.acquire(grant).await {
        Ok(Some(acquired)) => acquired,
        Ok(None) => {
            info!("Backend refused the presented credentials");
            return SignInOutcome::refused();
        }
        Err(e) => {
            warn!(error = %e, "Session acquisition failed");
            return SignInOutcome::login();
        }
    };

    let role = state.resolver.resolve(&acquired.session).await;
    let destination = redirect::landing_for(role.as_ref()).to_string();

    info!(
        user_id = %acquired.session.user.id,
        role = role.as_ref().map(|r| r.name.as_str()).unwrap_or("employee"),
        source = role.as_ref().map(|r| r.source.as_str()).unwrap_or("default"),
        destination = %destination,
        "Sign-in complete"
    );

    SignInOutcome {
        destination,
        session: Some(acquired),
        role,
        credentials_refused: false,
    }
}

/// Landing path for a session that already exists: one immediate pass over
/// the role chain.
pub async fn landing_now(state: &AppState, session: Option<&Session>) -> String {
    let Some(session) = session else {
        return landing::LOGIN.to_string();
    };
    let role = state.resolver.resolve_now(session).await;
    redirect::landing_for(role.as_ref()).to_string()
}

/// Axum handler for `/auth/callback`, the URL the backend sends users back
/// to after OAuth, email confirmation or a magic link. Runs the flow on its
/// own task so a panic anywhere inside still ends on the login page.
pub async fn auth_callback(
    State(state): State<AppState>,
    MaybeSession(established): MaybeSession,
    CookieRestore(restore): CookieRestore,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(err) = &query.error {
        warn!(
            error = %err,
            description = query.error_description.as_deref().unwrap_or_default(),
            "Backend returned an auth error"
        );
        let login = format!("{}?error={}", landing::LOGIN, urlencoding::encode(err));
        return Redirect::to(&login).into_response();
    }

    let grant = match SessionGrant::from_callback(&query, &headers) {
        // The auth middleware has already restored (and refreshed) stored cookies.
        Some(SessionGrant::Stored { .. }) | None if established.is_some() => {
            established.map(SessionGrant::Established)
        }
        // The middleware tried these cookies and got nothing; asking again
        // would spend the refresh token a second time.
        Some(SessionGrant::Stored { .. }) if restore.is_some() => {
            info!(?restore, "Stored session already rejected by middleware");
            None
        }
        other => other,
    };
    let had_verifier = cookies::extract_pkce_verifier(&headers).is_some();
    let had_stored = matches!(grant, Some(SessionGrant::Stored { .. }));

    let outcome = match tokio::spawn(async move { run_sign_in(&state, grant).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Sign-in flow aborted");
            SignInOutcome::login()
        }
    };

    let mut response = redirect::dispatch(&outcome.destination).into_response();
    let headers = response.headers_mut();

    match &outcome.session {
        Some(acquired) if acquired.issued => {
            let now = chrono::Utc::now().timestamp();
            cookies::set_session_cookies(headers, &acquired.session, now);
        }
        Some(_) => {}
        None if had_stored && outcome.credentials_refused => {
            cookies::clear_session_cookies(headers)
        }
        None => {}
    }

    if had_verifier {
        headers.append(header::SET_COOKIE, cookies::build_clear_pkce_cookie());
    }

    response
}
