//! Resilient request transport
//!
//! [`ResilientTransport`] issues exactly one logical request through an
//! [`ISheetClient`], pacing every attempt with the session's [`RateLimiter`]
//! and retrying transient failures with exponential backoff.
//!
//! Outcomes:
//! - success
//! - [`CallError::RequestTooLarge`], returned at once for the uploader to split
//! - [`CallError::Fatal`], for rejections and for transient failures that
//!   outlived every retry

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sheetsync_core::config::TransportConfig;
use sheetsync_core::domain::{Anchor, CellRange, Chunk, RangeValues, Row, WritePrimitive};
use sheetsync_core::ports::{ISheetClient, RemoteError};
use tracing::{debug, info, warn};

use crate::rate_limit::RateLimiter;
use crate::SyncError;

// ============================================================================
// RetryPolicy
// ============================================================================

/// How many times, and how patiently, transient failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff before retry `n` (0-based) is `2^n` of this unit
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    /// Wait before the retry following failed attempt `attempt` (0-based)
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_unit.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl From<&TransportConfig> for RetryPolicy {
    fn from(config: &TransportConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
        }
    }
}

// ============================================================================
// Destination / CallError
// ============================================================================

/// Where and how a chunk is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub primitive: WritePrimitive,
    /// Sheet cell that payload coordinate (1, 1) maps to
    pub anchor: Anchor,
}

impl Destination {
    pub fn new(primitive: WritePrimitive, anchor: Anchor) -> Self {
        Self { primitive, anchor }
    }

    /// Absolute range covered by `chunk`
    pub fn range_for(&self, chunk: &Chunk) -> Result<CellRange, SyncError> {
        Ok(self.anchor.range_of(
            chunk.start_row,
            chunk.end_row,
            chunk.start_col,
            chunk.end_col,
        )?)
    }
}

/// Failure of a single transport call
#[derive(Debug)]
pub enum CallError {
    /// The request must be made smaller; never retried here
    RequestTooLarge,
    /// Nothing more can be done for this request
    Fatal(SyncError),
}

impl From<SyncError> for CallError {
    fn from(err: SyncError) -> Self {
        CallError::Fatal(err)
    }
}

impl CallError {
    /// Collapse into a [`SyncError`] where splitting is not an option
    pub fn into_sync_error(self) -> SyncError {
        match self {
            CallError::RequestTooLarge => SyncError::Remote(RemoteError::RequestTooLarge),
            CallError::Fatal(err) => err,
        }
    }
}

// ============================================================================
// ResilientTransport
// ============================================================================

/// Paced, retrying access to one remote sheet
pub struct ResilientTransport {
    client: Arc<dyn ISheetClient>,
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl ResilientTransport {
    pub fn new(client: Arc<dyn ISheetClient>, limiter: RateLimiter, policy: RetryPolicy) -> Self {
        Self {
            client,
            limiter,
            policy,
        }
    }

    /// Transport configured from the `transport` config section
    pub fn from_config(client: Arc<dyn ISheetClient>, config: &TransportConfig) -> Self {
        Self::new(
            client,
            RateLimiter::from_millis(config.rate_limit_delay_ms),
            RetryPolicy::from(config),
        )
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Write one chunk with the destination's primitive
    pub async fn call(&self, destination: &Destination, chunk: &Chunk) -> Result<(), CallError> {
        let range = destination.range_for(chunk)?;
        let rows: &[Row] = &chunk.data;
        let operation = destination.primitive.to_string();
        debug!(
            operation = %operation,
            range = %range,
            rows = chunk.row_count(),
            cols = chunk.col_count(),
            "Sending chunk"
        );

        match destination.primitive {
            WritePrimitive::Overwrite => {
                self.execute(&operation, || self.client.overwrite_range(&range, rows))
                    .await
            }
            WritePrimitive::BatchOverwrite => {
                let batch = [RangeValues {
                    range: range.clone(),
                    values: chunk.data.clone(),
                }];
                self.execute(&operation, || self.client.batch_overwrite_ranges(&batch))
                    .await
            }
            WritePrimitive::Prepend => {
                self.execute(&operation, || self.client.prepend_rows(&range, rows))
                    .await
            }
            WritePrimitive::Append => {
                self.execute(&operation, || self.client.append_rows(&range, rows))
                    .await
            }
        }
    }

    /// Clear every range in one batch request
    pub async fn clear(&self, ranges: &[RangeValues]) -> Result<(), SyncError> {
        self.execute("clear", || self.client.batch_overwrite_ranges(ranges))
            .await
            .map_err(CallError::into_sync_error)
    }

    /// Read the values of a range
    pub async fn read(&self, range: &CellRange) -> Result<Vec<Row>, SyncError> {
        self.execute("read", || self.client.read_range(range))
            .await
            .map_err(CallError::into_sync_error)
    }

    /// Run `f` until it succeeds, fails permanently, or retries run out
    async fn execute<F, Fut, T>(&self, operation: &str, f: F) -> Result<T, CallError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            self.limiter.wait().await;
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(RemoteError::RequestTooLarge) => return Err(CallError::RequestTooLarge),
                Err(err) if err.is_transient() => {
                    if attempt >= self.policy.max_retries {
                        warn!(operation, attempts = attempt + 1, error = %err, "Retries exhausted");
                        return Err(CallError::Fatal(SyncError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts: attempt + 1,
                            last: err,
                        }));
                    }
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(CallError::Fatal(SyncError::Remote(err))),
            }
        }
    }
}
