//! Minimum spacing between outbound requests
//!
//! The sheet service throttles per tenant. Instead of reacting to 429s alone,
//! every request first passes a [`RateLimiter`] that keeps consecutive calls
//! at least `min_interval` apart.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use sheetsync_sync::rate_limit::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(Duration::from_millis(50));
//! limiter.wait().await;
//! // ... make API call ...
//! # }
//! ```
//!
//! One limiter belongs to one sync session. It is owned by the session's
//! `ResilientTransport`, so every delivery path shares the same spacing.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum interval between permitted calls
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    /// When the previous call was let through; held across the sleep so
    /// concurrent waiters are released one at a time.
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Suspend until a call is allowed, then record it as made
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let pause = self.min_interval - elapsed;
                debug!(wait_ms = pause.as_millis() as u64, "Spacing request");
                tokio::time::sleep(pause).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
