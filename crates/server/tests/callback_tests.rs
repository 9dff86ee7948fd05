//! Integration tests for the `/auth/callback` sign-in flow.
//!
//! Run with: `cargo test -p server --features server --test callback_tests`

#![cfg(feature = "server")]

mod common;

use axum::http::StatusCode;
use common::{
    assignment_row, expired_access_token, fast_roles, flat_row, get, refresh_token, test_app,
    test_app_with, valid_access_token, FakeBackend,
};
use pretty_assertions::assert_eq;
use shared_types::FeatureFlags;

const PKCE: &str = "hr_pkce_verifier=test-verifier";

#[tokio::test]
async fn role_in_assignment_relation_lands_on_its_page() {
    let app = test_app(
        FakeBackend::new()
            .with_code("code-u1", "U1")
            .with_rows("user_roles", "U1", vec![assignment_row("hr")])
            .with_rows("user_role", "U1", vec![flat_row("employee")]),
    )
    .await;

    let reply = get(&app.router, "/auth/callback?code=code-u1", Some(PKCE)).await;

    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/hr");
    assert_eq!(app.backend.role_queries(), vec!["user_roles"]);
}

#[tokio::test]
async fn successful_sign_in_persists_session_and_drops_verifier() {
    let app = test_app(
        FakeBackend::new()
            .with_code("code-u1", "U1")
            .with_rows("user_roles", "U1", vec![assignment_row("assessor")]),
    )
    .await;

    let reply = get(&app.router, "/auth/callback?code=code-u1", Some(PKCE)).await;

    assert!(reply.sets_cookie("hr_access"));
    assert!(reply.sets_cookie("hr_refresh"));
    assert!(reply.clears_cookie("hr_pkce_verifier"));
    assert!(reply
        .set_cookies()
        .iter()
        .filter(|c| c.starts_with("hr_"))
        .all(|c| c.contains("HttpOnly")));
}

#[tokio::test]
async fn user_without_any_role_lands_on_employee_page() {
    let app = test_app(FakeBackend::new().with_code("code-u2", "U2")).await;

    let reply = get(&app.router, "/auth/callback?code=code-u2", Some(PKCE)).await;

    assert_eq!(reply.location(), "/employee");
    assert_eq!(
        app.backend.role_queries(),
        vec!["user_roles", "user_role", "user_roles_view"]
    );
}

#[tokio::test]
async fn failing_first_source_falls_through_to_second() {
    let app = test_app(
        FakeBackend::new()
            .with_code("code-u3", "U3")
            .failing("user_roles")
            .with_rows("user_role", "U3", vec![flat_row("assessor")])
            .with_rows("user_roles_view", "U3", vec![flat_row("hr")]),
    )
    .await;

    let reply = get(&app.router, "/auth/callback?code=code-u3", Some(PKCE)).await;

    assert_eq!(reply.location(), "/assessor");
    assert_eq!(app.backend.role_queries(), vec!["user_roles", "user_role"]);
}

#[tokio::test]
async fn first_of_several_rows_wins() {
    let app = test_app(
        FakeBackend::new().with_code("code-u4", "U4").with_rows(
            "user_roles",
            "U4",
            vec![assignment_row("hr"), assignment_row("employee")],
        ),
    )
    .await;

    let reply = get(&app.router, "/auth/callback?code=code-u4", Some(PKCE)).await;
    assert_eq!(reply.location(), "/hr");
}

#[tokio::test]
async fn view_is_consulted_last() {
    let app = test_app(
        FakeBackend::new()
            .with_code("code-u5", "U5")
            .with_rows("user_roles", "U5", vec![])
            .with_rows("user_roles_view", "U5", vec![flat_row("Assessor")]),
    )
    .await;

    let reply = get(&app.router, "/auth/callback?code=code-u5", Some(PKCE)).await;
    assert_eq!(reply.location(), "/assessor");
}

#[tokio::test]
async fn unknown_role_name_lands_on_employee_page() {
    let app = test_app(
        FakeBackend::new()
            .with_code("code-u6", "U6")
            .with_rows("user_roles", "U6", vec![assignment_row("superuser")]),
    )
    .await;

    let reply = get(&app.router, "/auth/callback?code=code-u6", Some(PKCE)).await;

    assert_eq!(reply.location(), "/employee");
    assert_eq!(app.backend.role_queries(), vec!["user_roles"]);
}

#[tokio::test]
async fn blank_role_rows_are_not_usable() {
    let app = test_app(
        FakeBackend::new()
            .with_code("code-u7", "U7")
            .with_rows("user_roles", "U7", vec![assignment_row("  ")])
            .with_rows("user_role", "U7", vec![flat_row("hr")]),
    )
    .await;

    let reply = get(&app.router, "/auth/callback?code=code-u7", Some(PKCE)).await;
    assert_eq!(reply.location(), "/hr");
}

#[tokio::test]
async fn no_session_goes_to_login_without_role_queries() {
    let app = test_app(FakeBackend::new()).await;

    let reply = get(&app.router, "/auth/callback", None).await;

    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/login");
    assert!(app.backend.role_queries().is_empty());
    assert!(!reply.sets_cookie("hr_access"));
}

#[tokio::test]
async fn rejected_code_goes_to_login_without_role_queries() {
    let app = test_app(FakeBackend::new().with_rows("user_roles", "U1", vec![assignment_row("hr")]))
        .await;

    let reply = get(&app.router, "/auth/callback?code=forged", Some(PKCE)).await;

    assert_eq!(reply.location(), "/login");
    assert!(app.backend.role_queries().is_empty());
    assert!(reply.clears_cookie("hr_pkce_verifier"));
}

#[tokio::test]
async fn code_without_verifier_is_not_exchanged() {
    let app = test_app(FakeBackend::new().with_code("code-u1", "U1")).await;

    let reply = get(&app.router, "/auth/callback?code=code-u1", None).await;

    assert_eq!(reply.location(), "/login");
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn provider_error_goes_to_login_with_reason() {
    let app = test_app(FakeBackend::new()).await;

    let reply = get(
        &app.router,
        "/auth/callback?error=access_denied&error_description=User+cancelled",
        None,
    )
    .await;

    assert_eq!(reply.location(), "/login?error=access_denied");
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn email_confirmation_token_signs_in() {
    let app = test_app(
        FakeBackend::new()
            .with_token_hash("th-u8", "U8")
            .with_rows("user_role", "U8", vec![flat_row("assessor")]),
    )
    .await;

    let reply = get(&app.router, "/auth/callback?token_hash=th-u8&type=signup", None).await;

    assert_eq!(reply.location(), "/assessor");
    assert!(reply.sets_cookie("hr_access"));
}

#[tokio::test]
async fn stored_session_cookie_is_reused() {
    let app = test_app(
        FakeBackend::new()
            .with_user("U9")
            .with_rows("user_roles", "U9", vec![assignment_row("hr")]),
    )
    .await;
    let cookie = format!(
        "hr_access={}; hr_refresh={}",
        valid_access_token("U9"),
        refresh_token("U9")
    );

    let reply = get(&app.router, "/auth/callback", Some(&cookie)).await;

    assert_eq!(reply.location(), "/hr");
    assert!(!app.backend.calls().iter().any(|c| c.starts_with("POST token")));
    assert!(!reply.sets_cookie("hr_access"));
}

#[tokio::test]
async fn expired_stored_session_is_refreshed_once() {
    let app = test_app(
        FakeBackend::new()
            .with_user("U10")
            .with_rows("user_role", "U10", vec![flat_row("assessor")]),
    )
    .await;
    let cookie = format!(
        "hr_access={}; hr_refresh={}",
        expired_access_token("U10"),
        refresh_token("U10")
    );

    let reply = get(&app.router, "/auth/callback", Some(&cookie)).await;

    assert_eq!(reply.location(), "/assessor");
    assert!(reply.sets_cookie("hr_access"));
    assert_eq!(app.backend.refreshes(), 1);
}

#[tokio::test]
async fn revoked_refresh_token_goes_to_login_and_clears_cookies() {
    let app = test_app(FakeBackend::new()).await;
    let cookie = format!("hr_refresh={}", refresh_token("ghost"));

    let reply = get(&app.router, "/auth/callback", Some(&cookie)).await;

    assert_eq!(reply.location(), "/login");
    assert!(reply.clears_cookie("hr_access"));
    assert!(reply.clears_cookie("hr_refresh"));
    assert!(app.backend.role_queries().is_empty());
    assert_eq!(app.backend.refreshes(), 1);
}

#[tokio::test]
async fn auth_outage_keeps_session_cookies() {
    let app = test_app(FakeBackend::new().with_user("U14").token_endpoint_down()).await;
    let cookie = format!(
        "hr_access={}; hr_refresh={}",
        expired_access_token("U14"),
        refresh_token("U14")
    );

    let reply = get(&app.router, "/auth/callback", Some(&cookie)).await;

    assert_eq!(reply.location(), "/login");
    assert!(!reply.clears_cookie("hr_access"));
    assert!(!reply.clears_cookie("hr_refresh"));
    assert_eq!(app.backend.refreshes(), 1);
}

#[tokio::test]
async fn repeated_sign_in_is_stable() {
    let app = test_app(
        FakeBackend::new()
            .with_user("U11")
            .failing("user_roles")
            .with_rows("user_role", "U11", vec![flat_row("hr"), flat_row("assessor")]),
    )
    .await;
    let cookie = format!("hr_access={}", valid_access_token("U11"));

    let first = get(&app.router, "/auth/callback", Some(&cookie)).await;
    let second = get(&app.router, "/auth/callback", Some(&cookie)).await;

    assert_eq!(first.location(), "/hr");
    assert_eq!(first.location(), second.location());
}

#[tokio::test]
async fn settle_delay_is_waited_before_role_lookup() {
    let roles = shared_types::RoleSettings {
        settle_delay_ms: 150,
        ..fast_roles()
    };
    let app = test_app_with(
        FakeBackend::new()
            .with_code("code-u12", "U12")
            .with_rows("user_roles", "U12", vec![assignment_row("hr")]),
        roles,
        FeatureFlags::default(),
    )
    .await;

    let started = std::time::Instant::now();
    let reply = get(&app.router, "/auth/callback?code=code-u12", Some(PKCE)).await;

    assert_eq!(reply.location(), "/hr");
    assert!(started.elapsed() >= std::time::Duration::from_millis(150));
}

#[tokio::test]
async fn disabled_source_is_never_queried() {
    let mut roles = fast_roles();
    roles.direct.enabled = false;
    let app = test_app_with(
        FakeBackend::new()
            .with_code("code-u13", "U13")
            .with_rows("user_role", "U13", vec![flat_row("hr")])
            .with_rows("user_roles_view", "U13", vec![flat_row("assessor")]),
        roles,
        FeatureFlags::default(),
    )
    .await;

    let reply = get(&app.router, "/auth/callback?code=code-u13", Some(PKCE)).await;

    assert_eq!(reply.location(), "/assessor");
    assert_eq!(app.backend.role_queries(), vec!["user_roles", "user_roles_view"]);
}
