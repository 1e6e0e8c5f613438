//! sheetsync Sync - Mode engine and resilient bulk upload pipeline
//!
//! Provides:
//! - Four reconciliation modes (full, incremental, overwrite, clone)
//! - Column-major chunk planning within per-request bounds
//! - Adaptive bisection of chunks the service rejects as too large
//! - Retry with exponential backoff and minimum request spacing
//!
//! ## Modules
//!
//! - [`engine`] - `SyncModeEngine`, runs the phases of one sync
//! - [`policy`] - Pure per-mode decisions: which rows go where
//! - [`indexer`] - Index-key to row-position lookups
//! - [`planner`] - Splits payloads into bounded chunks
//! - [`uploader`] - Delivers one chunk, bisecting on "too large"
//! - [`transport`] - One request with classification and retry
//! - [`rate_limit`] - Minimum spacing between requests
//! - [`memory`] - In-memory `ISheetClient` for tests

pub mod engine;
pub mod indexer;
pub mod memory;
pub mod planner;
pub mod policy;
pub mod rate_limit;
pub mod transport;
pub mod uploader;

use sheetsync_core::domain::errors::DomainError;
use sheetsync_core::ports::RemoteError;
use thiserror::Error;

/// Errors that can end a synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// The service rejected a request outright; carries its error verbatim
    #[error("Remote rejected request: {0}")]
    Remote(RemoteError),

    /// A transient failure persisted through every retry
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Operation label, e.g. `overwrite`
        operation: String,
        /// Total attempts made
        attempts: u32,
        /// The failure seen on the final attempt
        last: RemoteError,
    },

    /// A single row is larger than the service accepts in one request
    #[error("Row {row} of the payload exceeds the request size limit on its own")]
    RowTooLarge {
        /// 1-based row within the payload
        row: u32,
    },

    /// The configured index column is not a local header
    #[error("Index column '{0}' not found in local headers")]
    IndexColumnNotFound(String),

    /// Column selection was combined with clone mode
    #[error("Selective column sync is not supported in clone mode")]
    SelectiveClone,

    /// A domain-level error propagated from sheetsync-core
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),
}

impl SyncError {
    /// Error code reported by the service, when the failure came from it
    #[must_use]
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            SyncError::Remote(RemoteError::Fatal { code, .. }) => Some(*code),
            _ => None,
        }
    }
}
