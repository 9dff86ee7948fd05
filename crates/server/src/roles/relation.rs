use serde_json::Value;
use shared_types::{RoleSourceKind, RoleSourceSettings, Session};

use super::RoleSource;
use crate::backend::{BackendClient, BackendError};

/// Role source backed by one backend relation, filtered by user id.
pub struct RelationRoleSource {
    kind: RoleSourceKind,
    relation: String,
    user_column: String,
    role_path: Vec<String>,
    select: String,
    client: BackendClient,
}

impl RelationRoleSource {
    pub fn new(kind: RoleSourceKind, settings: &RoleSourceSettings, client: BackendClient) -> Self {
        let role_path: Vec<String> = settings
            .role_path
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        let select = select_for_path(&role_path);
        Self {
            kind,
            relation: settings.relation.clone(),
            user_column: settings.user_column.clone(),
            role_path,
            select,
            client,
        }
    }
}

#[async_trait::async_trait]
impl RoleSource for RelationRoleSource {
    fn kind(&self) -> RoleSourceKind {
        self.kind
    }

    async fn fetch_role_names(&self, session: &Session) -> Result<Vec<String>, BackendError> {
        let rows = self
            .client
            .select_eq(
                &self.relation,
                &self.select,
                &self.user_column,
                &session.user.id,
                &session.access_token,
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| extract_role_name(row, &self.role_path))
            .collect())
    }
}

/// Embedded-select expression for a dot path: `roles.role_name` → `roles(role_name)`.
pub fn select_for_path(path: &[String]) -> String {
    match path.split_first() {
        None => "*".to_string(),
        Some((head, [])) => head.clone(),
        Some((head, rest)) => format!("{}({})", head, select_for_path(rest)),
    }
}

/// Walk `path` through a row. An embedded relation may come back as an
/// object or as an array; for arrays the first element is used. Blank
/// names count as missing.
pub fn extract_role_name(row: &Value, path: &[String]) -> Option<String> {
    let mut current = row;
    for key in path {
        if let Value::Array(items) = current {
            current = items.first()?;
        }
        current = current.get(key)?;
    }
    if let Value::Array(items) = current {
        current = items.first()?;
    }
    current
        .as_str()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
}
