//! Shared harness: an in-process fake of the hosted backend plus the real
//! router wired against it.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing,
    Json, Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use server::backend::BackendSettings;
use server::state::AppState;
use shared_types::{AppConfig, FeatureFlags, RoleSettings};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-jwt-secret";

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// HS256 access token the way the backend issues them.
pub fn access_token(user_id: &str, exp: i64) -> String {
    let claims = json!({
        "sub": user_id,
        "email": format!("{user_id}@example.com"),
        "aud": "authenticated",
        "exp": exp,
        "iat": now(),
        "role": "authenticated",
    });
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn valid_access_token(user_id: &str) -> String {
    access_token(user_id, now() + 3600)
}

pub fn expired_access_token(user_id: &str) -> String {
    access_token(user_id, now() - 3600)
}

pub fn refresh_token(user_id: &str) -> String {
    format!("refresh-{user_id}")
}

/// Role row shapes for the three default relations.
pub fn assignment_row(role: &str) -> Value {
    json!({ "roles": { "role_name": role } })
}

pub fn flat_row(role: &str) -> Value {
    json!({ "role_name": role })
}

/// What the fake backend knows. Built up with the `with_*` methods.
#[derive(Default)]
pub struct FakeBackend {
    users: HashSet<String>,
    codes: HashMap<String, String>,
    token_hashes: HashMap<String, String>,
    relations: HashMap<String, HashMap<String, Vec<Value>>>,
    failing: HashSet<String>,
    token_endpoint_down: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.users.insert(user_id.to_string());
        self
    }

    /// OAuth authorization code that exchanges into a session for `user_id`.
    pub fn with_code(mut self, code: &str, user_id: &str) -> Self {
        self.codes.insert(code.to_string(), user_id.to_string());
        self.with_user(user_id)
    }

    /// One-time email token that verifies into a session for `user_id`.
    pub fn with_token_hash(mut self, token_hash: &str, user_id: &str) -> Self {
        self.token_hashes
            .insert(token_hash.to_string(), user_id.to_string());
        self.with_user(user_id)
    }

    pub fn with_rows(mut self, relation: &str, user_id: &str, rows: Vec<Value>) -> Self {
        self.relations
            .entry(relation.to_string())
            .or_default()
            .insert(user_id.to_string(), rows);
        self
    }

    /// Every query against `relation` answers 500.
    pub fn failing(mut self, relation: &str) -> Self {
        self.failing.insert(relation.to_string());
        self
    }

    /// The token endpoint answers 503, as during an auth-service outage.
    #[allow(dead_code)]
    pub fn token_endpoint_down(mut self) -> Self {
        self.token_endpoint_down = true;
        self
    }

    pub async fn start(self) -> RunningBackend {
        let shared = Arc::new(Shared {
            data: self,
            log: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/auth/v1/token", routing::post(token))
            .route("/auth/v1/verify", routing::post(verify))
            .route("/auth/v1/user", routing::get(user))
            .route("/auth/v1/logout", routing::post(logout))
            .route("/auth/v1/health", routing::get(|| async { StatusCode::OK }))
            .route("/rest/v1/{relation}", routing::get(select))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RunningBackend {
            url: format!("http://{addr}"),
            shared,
        }
    }
}

struct Shared {
    data: FakeBackend,
    /// Every call, as `"{METHOD} {path}"`; rest queries as `"rest {relation}"`.
    log: Mutex<Vec<String>>,
}

impl Shared {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

pub struct RunningBackend {
    pub url: String,
    shared: Arc<Shared>,
}

impl RunningBackend {
    /// Relations queried so far, in order.
    pub fn role_queries(&self) -> Vec<String> {
        self.shared
            .log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.strip_prefix("rest ").map(String::from))
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.shared.log.lock().unwrap().clone()
    }

    /// How many refresh-token grants were requested.
    #[allow(dead_code)]
    pub fn refreshes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| *c == "POST token refresh_token")
            .count()
    }
}

fn session_body(user_id: &str) -> Value {
    json!({
        "access_token": valid_access_token(user_id),
        "refresh_token": refresh_token(user_id),
        "expires_in": 3600,
        "expires_at": now() + 3600,
        "token_type": "bearer",
        "user": { "id": user_id, "email": format!("{user_id}@example.com") },
    })
}

fn grant_error(status: StatusCode) -> Response {
    (status, Json(json!({ "error": "invalid_grant" }))).into_response()
}

async fn token(
    State(shared): State<Arc<Shared>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let grant_type = query.get("grant_type").cloned().unwrap_or_default();
    shared.record(format!("POST token {grant_type}"));

    if shared.data.token_endpoint_down {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "upstream unavailable" })),
        )
            .into_response();
    }

    let user_id = match grant_type.as_str() {
        "pkce" => body["auth_code"]
            .as_str()
            .and_then(|code| shared.data.codes.get(code))
            .cloned(),
        "refresh_token" => body["refresh_token"]
            .as_str()
            .and_then(|t| t.strip_prefix("refresh-"))
            .filter(|id| shared.data.users.contains(*id))
            .map(String::from),
        _ => None,
    };

    match user_id {
        Some(id) => Json(session_body(&id)).into_response(),
        None if grant_type == "refresh_token" => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token: Refresh Token Not Found",
            })),
        )
            .into_response(),
        None => grant_error(StatusCode::BAD_REQUEST),
    }
}

async fn verify(State(shared): State<Arc<Shared>>, Json(body): Json<Value>) -> Response {
    shared.record("POST verify".to_string());
    match body["token_hash"]
        .as_str()
        .and_then(|h| shared.data.token_hashes.get(h))
    {
        Some(id) => Json(session_body(id)).into_response(),
        None => grant_error(StatusCode::FORBIDDEN),
    }
}

fn bearer_user(headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    let mut validation = jsonwebtoken::Validation::new(Algorithm::HS256);
    validation.set_audience(&["authenticated"]);
    let data = jsonwebtoken::decode::<Value>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &validation,
    )
    .ok()?;
    data.claims["sub"].as_str().map(String::from)
}

async fn user(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    shared.record("GET user".to_string());
    match bearer_user(&headers) {
        Some(id) => Json(json!({ "id": id, "email": format!("{id}@example.com") })).into_response(),
        None => grant_error(StatusCode::UNAUTHORIZED),
    }
}

async fn logout(State(shared): State<Arc<Shared>>) -> StatusCode {
    shared.record("POST logout".to_string());
    StatusCode::NO_CONTENT
}

async fn select(
    State(shared): State<Arc<Shared>>,
    Path(relation): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    shared.record(format!("rest {relation}"));

    if headers.get("apikey").is_none() || bearer_user(&headers).is_none() {
        return grant_error(StatusCode::UNAUTHORIZED);
    }
    if shared.data.failing.contains(&relation) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "relation unavailable" })),
        )
            .into_response();
    }

    let user_id = query
        .get("user_id")
        .and_then(|f| f.strip_prefix("eq."))
        .unwrap_or_default();
    let rows = shared
        .data
        .relations
        .get(&relation)
        .and_then(|by_user| by_user.get(user_id))
        .cloned()
        .unwrap_or_default();
    Json(Value::Array(rows)).into_response()
}

// ── The app under test ──────────────────

pub struct TestApp {
    pub router: Router,
    pub backend: RunningBackend,
}

/// Role settings without the settle delay so tests stay fast.
pub fn fast_roles() -> RoleSettings {
    RoleSettings {
        settle_delay_ms: 0,
        query_timeout_ms: 2000,
        ..RoleSettings::default()
    }
}

#[allow(dead_code)]
pub async fn test_app(fake: FakeBackend) -> TestApp {
    test_app_with(fake, fast_roles(), FeatureFlags::default()).await
}

/// Router wired the way the app binary wires it: API routes with the auth
/// middleware on top.
pub async fn test_app_with(fake: FakeBackend, roles: RoleSettings, features: FeatureFlags) -> TestApp {
    let backend = fake.start().await;
    let config = AppConfig {
        features: features.clone(),
        roles,
        ..AppConfig::default()
    };
    let state = AppState::new(
        BackendSettings {
            url: backend.url.clone(),
            anon_key: "anon-key".to_string(),
            jwt_secret: Some(JWT_SECRET.to_string()),
            site_url: "http://portal.test".to_string(),
        },
        &config,
    );

    let router = server::openapi::api_router(state.clone(), &features).layer(
        middleware::from_fn_with_state(state, server::auth::middleware::auth_middleware),
    );

    TestApp { router, backend }
}

/// Response pieces tests look at.
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    #[allow(dead_code)]
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[allow(dead_code)]
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    /// True if a Set-Cookie for `name` is present with a non-empty value.
    #[allow(dead_code)]
    pub fn sets_cookie(&self, name: &str) -> bool {
        let prefix = format!("{name}=");
        self.set_cookies()
            .iter()
            .any(|c| c.starts_with(&prefix) && !c.starts_with(&format!("{prefix};")))
    }

    /// True if a Set-Cookie clears `name`.
    #[allow(dead_code)]
    pub fn clears_cookie(&self, name: &str) -> bool {
        let prefix = format!("{name}=;");
        self.set_cookies()
            .iter()
            .any(|c| c.starts_with(&prefix) && c.contains("Max-Age=0"))
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> Reply {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    Reply {
        status,
        headers,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

/// GET with an optional Cookie header.
#[allow(dead_code)]
pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Reply {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

/// GET with a Bearer access token.
#[allow(dead_code)]
pub async fn get_with_bearer(app: &Router, uri: &str, token: &str) -> Reply {
    let req = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

#[allow(dead_code)]
pub async fn post(app: &Router, uri: &str, cookie: Option<&str>) -> Reply {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}
