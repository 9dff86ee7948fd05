use serde::{Deserialize, Serialize};

use crate::FeatureFlags;

/// Top-level config file structure matching `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub roles: RoleSettings,
}

// ---------------------------------------------------------------------------
// Role lookup
// ---------------------------------------------------------------------------

/// Tuning and relation names for the post-login role lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleSettings {
    /// Pause before the first role query. Role rows are written by a separate
    /// provisioning step at sign-up and may lag the session by a moment.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Upper bound on a single role query; a timeout counts as a failed source.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Extra passes over the whole chain when every source came back empty.
    #[serde(default)]
    pub retry_attempts: u32,
    /// Delay before the first extra pass, doubled for each following one.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "RoleSourceSettings::assignment")]
    pub assignment: RoleSourceSettings,
    #[serde(default = "RoleSourceSettings::direct")]
    pub direct: RoleSourceSettings,
    #[serde(default = "RoleSourceSettings::view")]
    pub view: RoleSourceSettings,
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_retry_backoff_ms() -> u64 {
    250
}

impl Default for RoleSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            retry_attempts: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            assignment: RoleSourceSettings::assignment(),
            direct: RoleSourceSettings::direct(),
            view: RoleSourceSettings::view(),
        }
    }
}

/// One role-bearing relation in the backend.
///
/// `role_path` is a dot path into each returned row; `roles.role_name`
/// reads `{"roles": {"role_name": "hr"}}` and is requested from the backend
/// as the embedded select `roles(role_name)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleSourceSettings {
    pub relation: String,
    #[serde(default = "default_user_column")]
    pub user_column: String,
    #[serde(default = "default_role_path")]
    pub role_path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_user_column() -> String {
    "user_id".to_string()
}

fn default_role_path() -> String {
    "role_name".to_string()
}

fn default_enabled() -> bool {
    true
}

impl RoleSourceSettings {
    pub fn assignment() -> Self {
        Self {
            relation: "user_roles".to_string(),
            user_column: default_user_column(),
            role_path: "roles.role_name".to_string(),
            enabled: true,
        }
    }

    pub fn direct() -> Self {
        Self {
            relation: "user_role".to_string(),
            user_column: default_user_column(),
            role_path: default_role_path(),
            enabled: true,
        }
    }

    pub fn view() -> Self {
        Self {
            relation: "user_roles_view".to_string(),
            user_column: default_user_column(),
            role_path: default_role_path(),
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.roles.settle_delay_ms, 1000);
        assert_eq!(config.roles.retry_attempts, 0);
        assert_eq!(config.roles.assignment.role_path, "roles.role_name");
    }

    #[test]
    fn partial_source_table_fills_column_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [roles]
            settle_delay_ms = 0

            [roles.view]
            relation = "v_user_roles"
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.roles.settle_delay_ms, 0);
        assert_eq!(config.roles.view.relation, "v_user_roles");
        assert_eq!(config.roles.view.user_column, "user_id");
        assert_eq!(config.roles.view.role_path, "role_name");
        assert!(!config.roles.view.enabled);
        // Untouched sources keep their own defaults.
        assert_eq!(config.roles.direct, RoleSourceSettings::direct());
    }

    #[test]
    fn routes_table_is_not_configuration() {
        let config: AppConfig = toml::from_str(
            r#"
            [routes]
            hr = "/people/overview"
            "#,
        )
        .unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn features_section_parses() {
        let config: AppConfig = toml::from_str(
            r#"
            [features]
            oauth = true
            "#,
        )
        .unwrap();
        assert!(config.features.oauth);
        assert!(!config.features.telemetry);
    }
}
