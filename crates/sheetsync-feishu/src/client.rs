//! Feishu Open API client
//!
//! Provides a typed HTTP client for the Feishu Open API. Handles the tenant
//! token header, the `{code, msg, data}` response envelope and endpoint
//! construction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sheetsync_feishu::client::FeishuClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = FeishuClient::new("cli_app_id", "app-secret")?;
//! let token = client.tenant_token().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use sheetsync_core::config::{AuthConfig, TransportConfig};

use crate::auth::TenantTokenProvider;
use crate::FeishuError;

/// Open API root used when none is configured
pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn";

/// Request timeout used when none is configured
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest response body kept in an error message
const ERROR_BODY_LIMIT: usize = 500;

// ============================================================================
// Response envelope
// ============================================================================

/// Every Open API response wraps its payload in this envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

// ============================================================================
// FeishuClient
// ============================================================================

/// HTTP client for Feishu Open API calls
///
/// Wraps `reqwest::Client` with the tenant token header and base URL
/// construction. Performs exactly one HTTP request per call.
pub struct FeishuClient {
    http: Client,
    base_url: String,
    tokens: TenantTokenProvider,
}

impl FeishuClient {
    /// Creates a client for the app against the public Open API
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_base_url(app_id, app_secret, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `app_id` / `app_secret` - Internal app credentials
    /// * `base_url` - Open API root, without the `/open-apis` path
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    /// Returns an error if `base_url` is not a URL or the HTTP client cannot
    /// be built
    pub fn with_base_url(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Url::parse(base_url).with_context(|| format!("Invalid base URL '{base_url}'"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let tokens = TenantTokenProvider::new(http.clone(), &base_url, app_id, app_secret);
        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    /// Client for the app and endpoint named in the `auth` config section
    ///
    /// # Errors
    /// Returns [`FeishuError::MissingCredentials`] (as `anyhow::Error`) when
    /// `app_id` or `app_secret` is unset
    pub fn from_config(auth: &AuthConfig, transport: &TransportConfig) -> anyhow::Result<Self> {
        let (Some(app_id), Some(app_secret)) = (auth.app_id.as_deref(), auth.app_secret.as_deref())
        else {
            return Err(FeishuError::MissingCredentials.into());
        };
        Self::with_base_url(
            app_id,
            app_secret,
            &auth.base_url,
            Duration::from_secs(transport.request_timeout_secs),
        )
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A valid tenant access token
    ///
    /// # Errors
    /// See [`TenantTokenProvider::token`]
    pub async fn tenant_token(&self) -> Result<String, FeishuError> {
        self.tokens.token().await
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g. "/open-apis/...")
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, FeishuError> {
        let token = self.tokens.token().await?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header("Content-Type", "application/json; charset=utf-8"))
    }

    /// Sends a request and unwraps the response envelope
    ///
    /// # Returns
    /// The envelope's `data`, or `None` when the response carried none
    ///
    /// # Errors
    /// - [`FeishuError::Api`] for a non-zero envelope code
    /// - [`FeishuError::Http`] for an error status without an envelope
    /// - [`FeishuError::Network`] if no response arrived
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, FeishuError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.request(method.clone(), path).await?;
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%method, path, status = status.as_u16(), bytes = text.len(), "Response received");

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        unwrap_envelope(status, &text)
    }
}

/// Interpret a response body as an envelope
fn unwrap_envelope<T: DeserializeOwned>(
    status: StatusCode,
    text: &str,
) -> Result<Option<T>, FeishuError> {
    match serde_json::from_str::<Envelope<T>>(text) {
        Ok(envelope) if envelope.code != 0 => Err(FeishuError::Api {
            status: status.as_u16(),
            code: envelope.code,
            msg: envelope.msg,
        }),
        Ok(_) if !status.is_success() => Err(http_error(status, text)),
        Ok(envelope) => Ok(envelope.data),
        Err(_) if !status.is_success() => Err(http_error(status, text)),
        Err(e) => Err(FeishuError::InvalidResponse(format!(
            "unexpected response body: {e}"
        ))),
    }
}

fn http_error(status: StatusCode, text: &str) -> FeishuError {
    FeishuError::Http {
        status: status.as_u16(),
        body: text.chars().take(ERROR_BODY_LIMIT).collect(),
    }
}
