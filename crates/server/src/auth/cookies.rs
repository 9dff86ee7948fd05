use axum::http::{header, HeaderMap, HeaderValue};
use cookie::Cookie;
use shared_types::Session;

pub const SESSION_ACCESS: &str = "hr_access";
pub const SESSION_REFRESH: &str = "hr_refresh";
pub const PKCE_VERIFIER: &str = "hr_pkce_verifier";

/// Refresh tokens outlive access tokens; the backend decides when they stop working.
const REFRESH_COOKIE_DAYS: i64 = 30;

/// The PKCE verifier only has to survive the round trip through the provider.
const PKCE_COOKIE_SECS: i64 = 600;

fn cookie_secure() -> bool {
    std::env::var("COOKIE_SECURE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
}

fn cookie_domain() -> Option<String> {
    std::env::var("COOKIE_DOMAIN")
        .ok()
        .filter(|d| !d.is_empty())
}

fn build_cookie(name: &'static str, value: &str, max_age_secs: i64) -> HeaderValue {
    let mut cookie = Cookie::build((name, value))
        .http_only(true)
        .same_site(cookie::SameSite::Lax)
        .path("/")
        .max_age(cookie::time::Duration::seconds(max_age_secs.max(0)))
        .secure(cookie_secure());

    if let Some(domain) = cookie_domain() {
        cookie = cookie.domain(domain);
    }

    HeaderValue::from_str(&cookie.build().to_string()).expect("cookie header value should be valid")
}

/// Persist a session as two HTTP-only cookies. The access cookie lives as
/// long as the access token; the refresh cookie much longer.
pub fn set_session_cookies(headers: &mut HeaderMap, session: &Session, now: i64) {
    headers.append(
        header::SET_COOKIE,
        build_cookie(SESSION_ACCESS, &session.access_token, session.expires_at - now),
    );
    headers.append(
        header::SET_COOKIE,
        build_cookie(
            SESSION_REFRESH,
            &session.refresh_token,
            REFRESH_COOKIE_DAYS * 86400,
        ),
    );
}

/// Clear both session cookies on the response.
pub fn clear_session_cookies(headers: &mut HeaderMap) {
    headers.append(header::SET_COOKIE, build_cookie(SESSION_ACCESS, "", 0));
    headers.append(header::SET_COOKIE, build_cookie(SESSION_REFRESH, "", 0));
}

/// Set-Cookie header carrying the PKCE verifier for an OAuth round trip.
pub fn build_pkce_cookie(verifier: &str) -> HeaderValue {
    build_cookie(PKCE_VERIFIER, verifier, PKCE_COOKIE_SECS)
}

/// Set-Cookie header that clears the PKCE verifier after use.
pub fn build_clear_pkce_cookie() -> HeaderValue {
    build_cookie(PKCE_VERIFIER, "", 0)
}

/// Extract the access token from cookies (preferred) or Bearer header (fallback).
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie(headers, SESSION_ACCESS) {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

/// Whether the request carries either session cookie. A Bearer header
/// alone does not count.
pub fn has_session_cookies(headers: &HeaderMap) -> bool {
    extract_cookie(headers, SESSION_ACCESS).is_some()
        || extract_cookie(headers, SESSION_REFRESH).is_some()
}

pub fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    extract_cookie(headers, SESSION_REFRESH)
}

pub fn extract_pkce_verifier(headers: &HeaderMap) -> Option<String> {
    extract_cookie(headers, PKCE_VERIFIER)
}

/// Parse a specific non-empty cookie value from the Cookie header.
fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header_value in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = header_value.to_str() {
            for piece in cookie_str.split(';') {
                if let Ok(c) = Cookie::parse(piece.trim().to_string()) {
                    if c.name() == name && !c.value().is_empty() {
                        return Some(c.value().to_string());
                    }
                }
            }
        }
    }
    None
}
