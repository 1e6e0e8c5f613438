//! Sheet client port (driven/secondary port)
//!
//! This module defines the raw capability set of a remote spreadsheet: read
//! one range and the four write primitives. One method call is one request;
//! implementations do not retry, throttle, or split payloads. Those concerns
//! belong to the delivery pipeline in `sheetsync-sync`.
//!
//! ## Design Notes
//!
//! - Unlike most ports, failures are reported through the closed
//!   [`RemoteError`] vocabulary instead of `anyhow::Error`, because the
//!   pipeline branches on the failure class.
//! - Uses `#[async_trait]` for async trait methods.

use thiserror::Error;

use crate::domain::{CellRange, RangeValues, Row};

// ============================================================================
// RemoteError
// ============================================================================

/// Classified outcome of a failed remote request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The request body exceeded the service's per-request size limit
    #[error("Request too large")]
    RequestTooLarge,

    /// The service throttled the caller (HTTP 429 or equivalent)
    #[error("Rate limited")]
    RateLimited,

    /// The service failed internally (HTTP 5xx)
    #[error("Server error: HTTP {status}")]
    ServerError {
        /// HTTP status returned
        status: u16,
    },

    /// The request never produced a response (connection reset, timeout)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Any other rejection; not worth retrying
    #[error("Remote error {code}: {message}")]
    Fatal {
        /// Application error code, or the HTTP status when the body had none
        code: i64,
        /// Message supplied by the service
        message: String,
    },
}

impl RemoteError {
    /// Whether repeating the identical request may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::RateLimited | RemoteError::ServerError { .. } | RemoteError::NetworkError(_)
        )
    }
}

// ============================================================================
// ISheetClient trait
// ============================================================================

/// Port trait for a remote spreadsheet
///
/// Ranges are absolute, 1-based and inclusive. Every `rows` argument is
/// row-major and rectangular with the range's column count.
///
/// ## Implementation Notes
///
/// - A clear is expressed as [`batch_overwrite_ranges`](ISheetClient::batch_overwrite_ranges)
///   with empty `values`; implementations may treat "range does not exist"
///   as success in that case.
/// - `append_rows` writes after the last non-empty row at or below the
///   range start; `prepend_rows` inserts above the range start, shifting
///   existing rows down.
#[async_trait::async_trait]
pub trait ISheetClient: Send + Sync {
    /// Reads the values of a range
    ///
    /// # Returns
    /// Row-major values; trailing empty rows may or may not be present
    async fn read_range(&self, range: &CellRange) -> Result<Vec<Row>, RemoteError>;

    /// Replaces the values of one range
    ///
    /// # Arguments
    /// * `range` - Target block
    /// * `rows` - Values sized to the block
    async fn overwrite_range(&self, range: &CellRange, rows: &[Row]) -> Result<(), RemoteError>;

    /// Replaces the values of several ranges in one request
    ///
    /// # Arguments
    /// * `ranges` - Target blocks with their values (empty values clear the block)
    async fn batch_overwrite_ranges(&self, ranges: &[RangeValues]) -> Result<(), RemoteError>;

    /// Inserts rows above the first row of `range`
    async fn prepend_rows(&self, range: &CellRange, rows: &[Row]) -> Result<(), RemoteError>;

    /// Appends rows after the existing data in the columns of `range`
    async fn append_rows(&self, range: &CellRange, rows: &[Row]) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellRef, SheetId};
    use std::sync::Mutex;

    #[test]
    fn transient_classification() {
        assert!(RemoteError::RateLimited.is_transient());
        assert!(RemoteError::ServerError { status: 503 }.is_transient());
        assert!(RemoteError::NetworkError("reset".into()).is_transient());
        assert!(!RemoteError::RequestTooLarge.is_transient());
        assert!(!RemoteError::Fatal {
            code: 403,
            message: "forbidden".into()
        }
        .is_transient());
    }

    #[test]
    fn error_display() {
        let err = RemoteError::Fatal {
            code: 91402,
            message: "NOTEXIST".into(),
        };
        assert_eq!(err.to_string(), "Remote error 91402: NOTEXIST");
        assert_eq!(
            RemoteError::ServerError { status: 502 }.to_string(),
            "Server error: HTTP 502"
        );
    }

    /// Records range strings to check the trait is object safe and usable behind `dyn`
    struct RecordingClient {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ISheetClient for RecordingClient {
        async fn read_range(&self, range: &CellRange) -> Result<Vec<Row>, RemoteError> {
            self.calls.lock().unwrap().push(format!("read {range}"));
            Ok(Vec::new())
        }
        async fn overwrite_range(&self, range: &CellRange, _: &[Row]) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(format!("overwrite {range}"));
            Ok(())
        }
        async fn batch_overwrite_ranges(&self, ranges: &[RangeValues]) -> Result<(), RemoteError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("batch {}", ranges.len()));
            Ok(())
        }
        async fn prepend_rows(&self, range: &CellRange, _: &[Row]) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(format!("prepend {range}"));
            Ok(())
        }
        async fn append_rows(&self, range: &CellRange, _: &[Row]) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(format!("append {range}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn trait_is_usable_as_object() {
        let client: Box<dyn ISheetClient> = Box::new(RecordingClient {
            calls: Mutex::new(Vec::new()),
        });
        let sheet = SheetId::new("s".to_string()).unwrap();
        let range = CellRange::with_size(sheet, CellRef::origin(), 2, 2).unwrap();

        client.overwrite_range(&range, &[]).await.unwrap();
        client
            .batch_overwrite_ranges(&[RangeValues::clear(range.clone())])
            .await
            .unwrap();
        client.append_rows(&range, &[]).await.unwrap();
        assert!(client.read_range(&range).await.unwrap().is_empty());
    }
}
