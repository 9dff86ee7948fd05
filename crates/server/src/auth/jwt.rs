use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared_types::{Session, UserIdentity};

/// Audience the backend stamps on access tokens of signed-in users.
const AUDIENCE: &str = "authenticated";

/// Claims carried in a backend-issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub aud: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
    /// Database role the backend applies for row-level security
    /// (`authenticated`), not the application role.
    #[serde(default)]
    pub role: String,
}

impl Claims {
    /// Rebuild a session from a validated access token and its refresh token.
    pub fn into_session(self, access_token: &str, refresh_token: &str) -> Session {
        Session {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at: self.exp,
            user: UserIdentity {
                id: self.sub,
                email: self.email,
            },
        }
    }
}

/// Validate an access token locally against the backend's HS256 secret.
/// Rejects expired tokens and tokens for any other audience.
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Read `exp` without checking the signature. Only for tokens the backend
/// has just vouched for through a `get user` call.
pub fn peek_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.exp)
}
