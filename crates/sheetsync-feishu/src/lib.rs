//! sheetsync Feishu - Feishu Sheets Open API adapter
//!
//! Provides async access to:
//! - Tenant access tokens for an internal app (cached, refreshed early)
//! - The v2 value endpoints of one spreadsheet
//!
//! ## Modules
//!
//! - [`auth`] - Tenant access-token provider
//! - [`client`] - Authenticated HTTP client and response envelope handling
//! - [`provider`] - `ISheetClient` implementation over the value endpoints

pub mod auth;
pub mod client;
pub mod provider;

use sheetsync_core::ports::RemoteError;
use thiserror::Error;

/// Response code for a request body over the size limit
pub const CODE_REQUEST_TOO_LARGE: i64 = 90227;

/// Response code for an invalid range
pub const CODE_INVALID_RANGE: i64 = 90202;

/// Response code for exceeding the call frequency limit
pub const CODE_FREQUENCY_LIMIT: i64 = 99991400;

/// Errors that can occur when talking to the Feishu Open API
#[derive(Debug, Error)]
pub enum FeishuError {
    /// The app has no `app_id`/`app_secret`
    #[error("Missing app credentials")]
    MissingCredentials,

    /// The token endpoint refused the app credentials
    #[error("Authentication failed ({code}): {msg}")]
    Auth {
        /// Response code
        code: i64,
        /// Message supplied by the service
        msg: String,
    },

    /// The envelope carried a non-zero code
    #[error("API error {code} (HTTP {status}): {msg}")]
    Api {
        /// HTTP status of the response
        status: u16,
        /// Response code
        code: i64,
        /// Message supplied by the service
        msg: String,
    },

    /// A non-success status without a readable envelope
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status of the response
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FeishuError {
    /// Response code carried by the error, if any
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        match self {
            FeishuError::Auth { code, .. } | FeishuError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<FeishuError> for RemoteError {
    fn from(err: FeishuError) -> Self {
        match err {
            FeishuError::Http { status: 429, .. }
            | FeishuError::Api { status: 429, .. }
            | FeishuError::Api {
                code: CODE_FREQUENCY_LIMIT,
                ..
            } => RemoteError::RateLimited,
            FeishuError::Http { status: 413, .. }
            | FeishuError::Api {
                code: CODE_REQUEST_TOO_LARGE,
                ..
            } => RemoteError::RequestTooLarge,
            FeishuError::Http { status, .. } | FeishuError::Api { status, .. }
                if (500..600).contains(&status) =>
            {
                RemoteError::ServerError { status }
            }
            FeishuError::Api { code, msg, .. } | FeishuError::Auth { code, msg } => {
                RemoteError::Fatal { code, message: msg }
            }
            FeishuError::Http { status, body } => RemoteError::Fatal {
                code: i64::from(status),
                message: body,
            },
            FeishuError::Network(e) => RemoteError::NetworkError(e.to_string()),
            FeishuError::MissingCredentials => RemoteError::Fatal {
                code: -1,
                message: "missing app credentials".to_string(),
            },
            FeishuError::InvalidResponse(msg) => RemoteError::Fatal {
                code: -1,
                message: msg,
            },
        }
    }
}
