/// Bounded waits for slow backend calls
///
/// A [`Deadline`] runs a backend call with a fresh `CancellationToken` and
/// cancels that token when the timeout elapses. The call future is raced
/// against the token and dropped when it fires, so the in-flight request is
/// aborted rather than left running with its late answer discarded.
///
/// # Timeout Bounds
///
/// - Default (auth calls): 5 seconds
/// - Minimum: 100 milliseconds
/// - Maximum: 60 seconds
///
/// # Example
///
/// ```no_run
/// use schoolhub_shared::timeout::Deadline;
/// use schoolhub_shared::error::DataResult;
/// use std::time::Duration;
///
/// # async fn example() -> DataResult<()> {
/// let deadline = Deadline::new(Duration::from_secs(5));
///
/// let value = deadline
///     .run("probe", |_cancel| async move { Ok::<_, schoolhub_shared::DataError>(42) })
///     .await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```

use crate::error::{DataError, DataResult};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Default bound for auth calls (5 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum allowed bound (100 ms)
pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Maximum allowed bound (60 seconds)
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for one class of backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    timeout: Duration,
}

impl Default for Deadline {
    fn default() -> Self {
        Deadline::new(DEFAULT_TIMEOUT)
    }
}

impl Deadline {
    /// Creates a deadline, clamped to `MIN_TIMEOUT..=MAX_TIMEOUT`
    pub fn new(timeout: Duration) -> Self {
        Deadline {
            timeout: timeout.clamp(MIN_TIMEOUT, MAX_TIMEOUT),
        }
    }

    /// Creates a deadline from a millisecond setting (None = default)
    pub fn from_millis(timeout_ms: Option<u64>) -> Self {
        match timeout_ms {
            Some(ms) => Deadline::new(Duration::from_millis(ms)),
            None => Deadline::default(),
        }
    }

    /// Cancels `cancel_token` once the timeout elapses
    ///
    /// The returned handle should be aborted when the guarded call finishes
    /// first.
    pub fn enforce(&self, label: &'static str, cancel_token: CancellationToken) -> JoinHandle<()> {
        let timeout = self.timeout;

        tokio::spawn(async move {
            sleep(timeout).await;

            if cancel_token.is_cancelled() {
                return;
            }

            tracing::warn!(
                call = label,
                timeout_ms = timeout.as_millis() as u64,
                "Backend call exceeded deadline, cancelling"
            );
            cancel_token.cancel();
        })
    }

    /// Runs `op` under this deadline
    ///
    /// `op` receives the token that fires at the deadline. If the deadline
    /// wins, the call future is dropped and `DataError::Timeout` returned.
    pub async fn run<T, F, Fut>(&self, label: &'static str, op: F) -> DataResult<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = DataResult<T>>,
    {
        let token = CancellationToken::new();
        let guard = self.enforce(label, token.clone());

        let result = cancellable(&token, op(token.clone())).await;
        guard.abort();

        match result {
            Err(DataError::Cancelled) if token.is_cancelled() => {
                Err(DataError::Timeout(self.timeout.as_millis() as u64))
            }
            other => other,
        }
    }

    /// Gets the timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Races `fut` against `cancel`, dropping `fut` if the token fires first
pub async fn cancellable<T, Fut>(cancel: &CancellationToken, fut: Fut) -> DataResult<T>
where
    Fut: Future<Output = DataResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DataError::Cancelled),
        result = fut => result,
    }
}
