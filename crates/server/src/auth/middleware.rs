use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use super::cookies;
use super::session::{SessionGrant, SessionRestore};
use crate::state::AppState;

/// Permissive auth middleware that handles session cookies.
///
/// On each request:
/// 1. Validates the access token from cookies (or Bearer header fallback)
/// 2. If expired or missing, attempts transparent refresh using the refresh cookie
/// 3. Inserts the resulting `Session`, and a [`SessionRestore`] saying how it
///    went, into request extensions
/// 4. After the handler runs, writes rotated tokens back as cookies, or
///    clears session cookies the backend refused
///
/// Does NOT reject unauthenticated requests; downstream handlers decide authorization.
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let mut rotated = None;
    let mut refused_cookies = false;

    if let Some(grant) = SessionGrant::from_cookies(req.headers()) {
        let restore = match state.sessions.acquire(grant).await {
            Ok(Some(acquired)) => {
                if acquired.issued {
                    rotated = Some(acquired.session.clone());
                }
                req.extensions_mut().insert(acquired.session);
                SessionRestore::Restored
            }
            Ok(None) => SessionRestore::Refused,
            Err(e) => {
                warn!(error = %e, "Could not restore session from cookies");
                SessionRestore::Unavailable
            }
        };
        refused_cookies =
            restore == SessionRestore::Refused && cookies::has_session_cookies(req.headers());
        req.extensions_mut().insert(restore);
    }

    let mut response = next.run(req).await;

    // A handler that already wrote session cookies (sign-in, sign-out) wins.
    let handler_set_cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| {
            v.to_str()
                .map(|c| c.starts_with(cookies::SESSION_ACCESS))
                .unwrap_or(false)
        });
    if handler_set_cookies {
        return response;
    }

    if let Some(session) = rotated {
        let now = chrono::Utc::now().timestamp();
        cookies::set_session_cookies(response.headers_mut(), &session, now);
    } else if refused_cookies {
        debug!("Clearing refused session cookies");
        cookies::clear_session_cookies(response.headers_mut());
    }

    response
}
