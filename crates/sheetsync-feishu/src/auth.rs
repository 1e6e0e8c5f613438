//! Tenant access tokens
//!
//! An internal Feishu app authenticates with its `app_id` and `app_secret`
//! and receives a tenant access token valid for `expire` seconds.
//! [`TenantTokenProvider`] caches the token and fetches a new one five
//! minutes before the old one runs out.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::FeishuError;

/// Path of the tenant token endpoint
pub const TENANT_TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";

/// How long before expiry a cached token is replaced
const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Lifetime assumed when the response omits `expire`
const DEFAULT_EXPIRE_SECS: i64 = 7200;

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
    expire: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Fetches and caches the tenant access token of one app
pub struct TenantTokenProvider {
    http: Client,
    token_url: String,
    app_id: String,
    app_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TenantTokenProvider {
    /// Creates a provider for the app, talking to `base_url`
    ///
    /// # Arguments
    /// * `http` - Shared HTTP client
    /// * `base_url` - Open API root, e.g. `https://open.feishu.cn`
    pub fn new(
        http: Client,
        base_url: &str,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}{}", base_url.trim_end_matches('/'), TENANT_TOKEN_PATH),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            cached: Mutex::new(None),
        }
    }

    /// A valid tenant access token, fetched if the cached one is stale
    ///
    /// # Errors
    /// - [`FeishuError::Auth`] if the service rejects the credentials
    /// - [`FeishuError::Network`] if the request cannot be made
    pub async fn token(&self) -> Result<String, FeishuError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }

        let fetched = self.fetch().await?;
        let value = fetched.value.clone();
        *cached = Some(fetched);
        Ok(value)
    }

    /// Drop the cached token so the next call fetches a new one
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
        debug!("Tenant access token invalidated");
    }

    async fn fetch(&self) -> Result<CachedToken, FeishuError> {
        debug!(url = %self.token_url, "Requesting tenant access token");
        let response = self
            .http
            .post(&self.token_url)
            .json(&TokenRequest {
                app_id: &self.app_id,
                app_secret: &self.app_secret,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|_| FeishuError::Http {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })?;

        if parsed.code != 0 {
            return Err(FeishuError::Auth {
                code: parsed.code,
                msg: parsed.msg,
            });
        }
        let value = parsed.tenant_access_token.ok_or_else(|| {
            FeishuError::InvalidResponse("token response without tenant_access_token".into())
        })?;
        let lifetime = parsed.expire.unwrap_or(DEFAULT_EXPIRE_SECS);

        info!(expires_in_secs = lifetime, "Obtained tenant access token");
        Ok(CachedToken {
            value,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        })
    }
}
