use serde::{Deserialize, Serialize};

/// Permission tier deciding which landing page and feature set a user sees.
///
/// - `Employee`: self-service: own profile, own assessments. Also the default
///   for users with no role assignment at all.
/// - `Assessor`: runs consensus assessments for assigned employees.
/// - `Hr`: manages employees, job profiles and competency frameworks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Assessor,
    Hr,
}

impl Role {
    /// Parse a stored role name. Case and surrounding whitespace are ignored;
    /// anything else is `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "employee" => Some(Role::Employee),
            "assessor" => Some(Role::Assessor),
            "hr" => Some(Role::Hr),
            _ => None,
        }
    }

    /// Parse a stored role name, falling back to `Employee` for unknown values.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }

    /// Lowercase name as stored by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Assessor => "assessor",
            Role::Hr => "hr",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Role::Employee => 0,
            Role::Assessor => 1,
            Role::Hr => 2,
        }
    }

    /// Whether this role may act where `required` is needed. HR satisfies
    /// every role; Assessor satisfies Assessor and Employee.
    pub fn satisfies(&self, required: &Role) -> bool {
        self.rank() >= required.rank()
    }
}

/// Which backend relation a role assignment was read from, in lookup order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum RoleSourceKind {
    /// User ↔ role join relation, role name nested under the joined key.
    Assignment,
    /// Flat per-user role relation.
    Direct,
    /// Precomputed per-user role view.
    View,
}

impl RoleSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleSourceKind::Assignment => "assignment",
            RoleSourceKind::Direct => "direct",
            RoleSourceKind::View => "view",
        }
    }
}

/// A role name as found in the backend, before it is mapped to a route.
/// The raw name is kept so unrecognised values can be logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResolvedRole {
    pub name: String,
    pub source: RoleSourceKind,
}

impl ResolvedRole {
    pub fn role(&self) -> Option<Role> {
        Role::from_name(&self.name)
    }
}

/// Identity providers the backend can federate sign-in to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Azure,
    GitHub,
}

impl OAuthProvider {
    /// Provider name as the backend's authorize endpoint expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Azure => "azure",
            OAuthProvider::GitHub => "github",
        }
    }

    pub fn parse_provider(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" => Some(OAuthProvider::Google),
            "azure" => Some(OAuthProvider::Azure),
            "github" => Some(OAuthProvider::GitHub),
            _ => None,
        }
    }
}

/// Authenticated principal as issued by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// Time-bounded credential bundle issued by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of `access_token`, seconds since the Unix epoch.
    pub expires_at: i64,
    pub user: UserIdentity,
}

impl Session {
    /// Seconds before `expires_at` at which a token is already treated as expired.
    pub const EXPIRY_SKEW_SECS: i64 = 30;

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at - Self::EXPIRY_SKEW_SECS
    }
}

/// Authenticated user info returned by `/api/v1/me` (safe to send to client).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    /// Where the role was found; `None` when the user fell back to the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_source: Option<RoleSourceKind>,
}

/// Where the post-login flow sends the current caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LandingResponse {
    pub destination: String,
}
