use serde::{Deserialize, Serialize};

/// Feature flags controlling which optional integrations are active.
///
/// Loaded from `config.toml` at server startup and exposed to clients
/// via a server function. Every field defaults to `false` so that a
/// missing or incomplete config file disables all optional features.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FeatureFlags {
    /// Social sign-in through the backend's OAuth providers.
    #[serde(default)]
    pub oauth: bool,
    /// OTLP export of traces and logs.
    #[serde(default)]
    pub telemetry: bool,
}
