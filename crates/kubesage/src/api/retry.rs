//! Transport retry for provider calls.
//!
//! Only failures that say nothing about the request itself are retried: rate
//! limiting, request timeouts, 5xx responses and dropped connections. A 4xx
//! other than 408/429 comes back on the first try. The diagnostic
//! pipeline's own attempt loop lives in [`crate::rag`].

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Backoff policy for [`retry_call`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts after the first call. 0 disables retrying.
    pub max_retries: u32,
    /// Wait before the first retry; doubles on every further retry.
    pub base_delay: Duration,
    /// Upper bound for a single wait.
    pub max_delay: Duration,
    /// Shorten each wait by a per-attempt fraction so concurrent sessions
    /// drift apart.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// No retries at all.
    pub fn disabled() -> Self {
        Self::with_retries(0)
    }

    /// Wait before retry number `retry` (0 is the first retry).
    pub fn backoff(&self, retry: u32) -> Duration {
        let doubled = self
            .base_delay
            .checked_mul(2u32.saturating_pow(retry))
            .unwrap_or(self.max_delay);
        let wait = doubled.min(self.max_delay);
        if self.jitter {
            const FACTORS: [f64; 4] = [0.7, 0.8, 0.9, 1.0];
            wait.mul_f64(FACTORS[(retry % 4) as usize])
        } else {
            wait
        }
    }
}

/// HTTP status embedded in a client error (`"... HTTP 503 Service ..."`).
fn http_status(error: &str) -> Option<u16> {
    let (_, rest) = error.split_once("HTTP ")?;
    rest.get(..3)?.parse().ok()
}

/// Whether a provider error is worth another try.
pub fn is_transient_error(error: &str) -> bool {
    if let Some(status) = http_status(error) {
        return status == 408 || status == 429 || (500..600).contains(&status);
    }
    let lower = error.to_lowercase();
    [
        "request failed:",
        "connection reset",
        "connection refused",
        "connection closed",
        "broken pipe",
        "timed out",
        "dns error",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}

/// Call `call` until it succeeds, fails for good, or `config.max_retries`
/// retries are used up.
pub async fn retry_call<T, F, Fut>(config: &RetryConfig, mut call: F) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut retry = 0;
    loop {
        let error = match call().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if retry >= config.max_retries {
            if config.max_retries > 0 {
                debug!("provider call failed after {} retries", config.max_retries);
            }
            return Err(error);
        }
        if !is_transient_error(&error) {
            return Err(error);
        }
        let wait = config.backoff(retry);
        warn!(
            "provider call failed (retry {}/{} in {}ms): {error}",
            retry + 1,
            config.max_retries,
            wait.as_millis()
        );
        tokio::time::sleep(wait).await;
        retry += 1;
    }
}
