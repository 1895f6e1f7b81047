/// Read-failure and retry policy shared by every entity service
///
/// One [`ResiliencePolicy`] value decides, for all services at once:
///
/// - whether a failed list read degrades to fallback data or propagates
/// - how many times a retryable read is re-attempted, with exponential
///   backoff starting at `retry_delay`
///
/// Only reads go through the policy. Writes are sent once and their errors
/// always reach the caller.
///
/// # Example
///
/// ```
/// use schoolhub_shared::resilience::{ReadFailure, ResiliencePolicy};
/// use std::time::Duration;
///
/// let policy = ResiliencePolicy {
///     read_failure: ReadFailure::Propagate,
///     max_retries: 2,
///     retry_delay: Duration::from_millis(100),
/// };
/// assert_eq!(policy.backoff(2), Duration::from_millis(200));
/// ```

use crate::error::{DataError, DataResult};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for a single backoff sleep
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// What a list read does when the backend fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadFailure {
    /// Serve fallback rows where a fallback source exists
    #[default]
    Fallback,

    /// Return the error
    Propagate,
}

impl FromStr for ReadFailure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(ReadFailure::Fallback),
            "propagate" => Ok(ReadFailure::Propagate),
            other => Err(format!(
                "unknown read failure mode '{}', expected 'fallback' or 'propagate'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResiliencePolicy {
    pub read_failure: ReadFailure,

    /// Extra attempts after the first, for retryable errors only
    pub max_retries: u32,

    /// Base delay between attempts
    pub retry_delay: Duration,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        ResiliencePolicy {
            read_failure: ReadFailure::Fallback,
            max_retries: 0,
            retry_delay: Duration::from_millis(250),
        }
    }
}

impl ResiliencePolicy {
    /// Policy that never retries and never falls back
    pub fn strict() -> Self {
        ResiliencePolicy {
            read_failure: ReadFailure::Propagate,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay
            .saturating_mul(factor)
            .min(MAX_RETRY_DELAY)
    }

    /// Runs a read, retrying retryable errors up to `max_retries` times
    pub async fn retry<T, F, Fut>(&self, table: &'static str, mut op: F) -> DataResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DataResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        table = table,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Runs a list read, degrading to `fallback` when the policy allows it
    ///
    /// Without a fallback source the error always propagates.
    pub async fn read_or_fallback<T, F, Fut, G>(
        &self,
        table: &'static str,
        op: F,
        fallback: Option<G>,
    ) -> DataResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DataResult<T>>,
        G: FnOnce() -> T,
    {
        match self.retry(table, op).await {
            Ok(value) => Ok(value),
            Err(e) => match (self.read_failure, fallback) {
                (ReadFailure::Fallback, Some(fallback)) => {
                    if e.is_unavailable() {
                        tracing::warn!(table = table, error = %e, "Backend unavailable, serving fallback data");
                    } else {
                        tracing::warn!(
                            table = table,
                            error = %e,
                            "Backend answered but the read failed, serving fallback data"
                        );
                    }
                    Ok(fallback())
                }
                _ => Err(e),
            },
        }
    }
}

/// Fallback source type for reads that have none
pub type NoFallback<T> = fn() -> T;

/// Convenience for `read_or_fallback` callers without a fallback source
pub fn no_fallback<T>() -> Option<NoFallback<T>> {
    None
}
