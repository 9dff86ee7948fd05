use axum::extract::FromRef;
use shared_types::AppConfig;
use std::sync::{Arc, OnceLock};

use crate::auth::session::SessionAcquirer;
use crate::backend::{BackendClient, BackendError, BackendSettings};
use crate::roles::RoleResolver;

/// Shared application state passed to Axum handlers via `State`.
/// Derives `FromRef` so handlers can extract `State<BackendClient>` directly.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub backend: BackendClient,
    pub sessions: Arc<SessionAcquirer>,
    pub resolver: Arc<RoleResolver>,
}

impl AppState {
    /// Wire the backend client, session acquirer and role chain from config.
    pub fn new(settings: BackendSettings, config: &AppConfig) -> Self {
        let backend = BackendClient::new(settings);
        let jwt_secret = backend.settings().jwt_secret.clone();
        let resolver = RoleResolver::from_settings(&backend, &config.roles);
        Self {
            sessions: Arc::new(SessionAcquirer::new(Arc::new(backend.clone()), jwt_secret)),
            resolver: Arc::new(resolver),
            backend,
        }
    }

    /// Build from `BACKEND_*` env vars (and `.env` if present).
    pub fn from_env(config: &AppConfig) -> Result<Self, BackendError> {
        let _ = dotenvy::dotenv();
        Ok(Self::new(BackendSettings::from_env()?, config))
    }
}

/// Process-wide state for Dioxus server functions, which cannot take
/// axum `State`. REST handlers use `State<AppState>` instead.
static STATE: OnceLock<AppState> = OnceLock::new();

/// Install the state built at startup. Only the first call has effect.
pub fn install(state: AppState) -> &'static AppState {
    STATE.get_or_init(|| state)
}

/// Installed state, or a state built from env on first use.
pub fn app_state() -> Result<&'static AppState, BackendError> {
    if let Some(state) = STATE.get() {
        return Ok(state);
    }
    let state = AppState::from_env(crate::config::app_config())?;
    Ok(install(state))
}
