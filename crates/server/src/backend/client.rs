use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use shared_types::{Session, UserIdentity};

use super::{AuthBackend, BackendError, BackendSettings, TokenResponse};

/// HTTP client for the hosted backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    settings: BackendSettings,
}

impl BackendClient {
    pub fn new(settings: BackendSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.settings.url, path)
    }

    /// Attach the project API key, and the user's token when there is one.
    fn with_keys(&self, builder: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        let builder = builder.header("apikey", &self.settings.anon_key);
        match access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Parse a response, mapping non-2xx statuses to `BackendError::Status`.
    async fn parse<R: DeserializeOwned>(resp: Response) -> Result<R, BackendError> {
        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: code,
                message: body,
            });
        }
        resp.json::<R>()
            .await
            .map_err(|e| BackendError::Decode(format!("response body: {}", e)))
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, BackendError> {
        let req = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let resp = self.with_keys(req, None).send().await?;
        let token: TokenResponse = Self::parse(resp).await?;
        Ok(token.into_session(chrono::Utc::now().timestamp()))
    }

    /// `GET /rest/v1/{relation}?select={select}&{column}=eq.{value}` as the given user,
    /// so row-level security applies. Rows come back in backend order.
    pub async fn select_eq(
        &self,
        relation: &str,
        select: &str,
        column: &str,
        value: &str,
        access_token: &str,
    ) -> Result<Vec<serde_json::Value>, BackendError> {
        let url = format!("{}/rest/v1/{}", self.settings.url, relation);
        let filter = format!("eq.{}", value);
        let req = self
            .http
            .get(url)
            .query(&[("select", select), (column, filter.as_str())]);
        let resp = self.with_keys(req, Some(access_token)).send().await?;
        Self::parse(resp).await
    }

    /// Revoke the session server-side.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let req = self.http.post(self.auth_url("logout"));
        let resp = self.with_keys(req, Some(access_token)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }

    /// Backend auth health endpoint, used by `/health`.
    pub async fn health(&self) -> Result<(), BackendError> {
        let req = self.http.get(self.auth_url("health"));
        let resp = self.with_keys(req, None).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            })
        }
    }

    /// URL of the backend's OAuth entry point for `provider`, carrying a PKCE
    /// S256 challenge. The provider returns to `{site_url}/auth/callback`.
    pub fn authorize_url(&self, provider: &str, code_challenge: &str) -> Result<String, BackendError> {
        let redirect_to = format!("{}/auth/callback", self.settings.site_url);
        let url = Url::parse_with_params(
            &self.auth_url("authorize"),
            &[
                ("provider", provider),
                ("redirect_to", redirect_to.as_str()),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "s256"),
            ],
        )
        .map_err(|e| BackendError::Config(format!("invalid BACKEND_URL: {}", e)))?;
        Ok(url.to_string())
    }
}

#[async_trait::async_trait]
impl AuthBackend for BackendClient {
    async fn exchange_pkce(&self, code: &str, verifier: &str) -> Result<Session, BackendError> {
        self.token_grant(
            "pkce",
            serde_json::json!({ "auth_code": code, "code_verifier": verifier }),
        )
        .await
    }

    async fn verify_otp(&self, token_hash: &str, kind: &str) -> Result<Session, BackendError> {
        let req = self
            .http
            .post(self.auth_url("verify"))
            .json(&serde_json::json!({ "type": kind, "token_hash": token_hash }));
        let resp = self.with_keys(req, None).send().await?;
        let token: TokenResponse = Self::parse(resp).await?;
        Ok(token.into_session(chrono::Utc::now().timestamp()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn get_user(&self, access_token: &str) -> Result<UserIdentity, BackendError> {
        let req = self.http.get(self.auth_url("user"));
        let resp = self.with_keys(req, Some(access_token)).send().await?;
        Self::parse(resp).await
    }
}
