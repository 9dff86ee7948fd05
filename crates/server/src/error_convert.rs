use dioxus::prelude::ServerFnError;
use shared_types::AppError;

use crate::backend::BackendError;

/// Convert a BackendError into an AppError. Credential rejections become
/// 401; everything else is an upstream failure whose detail stays in the logs.
pub fn backend_to_app_error(err: BackendError) -> AppError {
    if err.is_auth_rejection() {
        return AppError::unauthorized("Session is no longer valid");
    }
    match &err {
        BackendError::Config(msg) => AppError::internal(msg.clone()),
        _ => {
            tracing::warn!(error = %err, "Backend call failed");
            AppError::upstream("The sign-in service is unavailable")
        }
    }
}

/// Convert an AppError into a ServerFnError by serializing as JSON.
pub fn app_error_to_server_fn_error(err: AppError) -> ServerFnError {
    let json = serde_json::to_string(&err).unwrap_or_else(|_| err.message.clone());
    ServerFnError::new(json)
}

/// Extension trait providing `.into_app_error()` on BackendError.
pub trait BackendErrorExt {
    fn into_app_error(self) -> AppError;
}

impl BackendErrorExt for BackendError {
    fn into_app_error(self) -> AppError {
        backend_to_app_error(self)
    }
}

/// Extension trait providing `.into_server_fn_error()` on AppError.
pub trait AppErrorExt {
    fn into_server_fn_error(self) -> ServerFnError;
}

impl AppErrorExt for AppError {
    fn into_server_fn_error(self) -> ServerFnError {
        app_error_to_server_fn_error(self)
    }
}
