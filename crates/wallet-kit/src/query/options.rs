//! Per-query options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;

/// Called with the data of a successful fetch.
pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Called with the error of a failed fetch.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Called after every fetch, successful or not.
pub type SettledCallback<T> = Arc<dyn Fn(Option<&T>, Option<&Error>) + Send + Sync>;

/// Highest accepted `retry` value.
pub const MAX_RETRY: u32 = 16;

/// Upper bound on the backoff between retries.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Cache time of entries that no fetch has configured yet.
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);

/// Options for a single [`QueryClient::fetch`](super::QueryClient::fetch).
///
/// | Option | Default |
/// |--------|---------|
/// | `cache_time` | 5 minutes |
/// | `stale_time` | 0 (always stale) |
/// | `enabled` | `true` |
/// | `suspense` | `false` |
/// | `retry` | 0 |
/// | `retry_delay` | 1 second, doubled per attempt, capped at 30 seconds |
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use wallet_kit::QueryOptions;
///
/// let options: QueryOptions<u64> = QueryOptions::default()
///     .stale_time(Duration::from_secs(10))
///     .retry(2)
///     .on_success(|gas| println!("estimated {}", gas));
/// assert!(options.validate().is_ok());
/// ```
pub struct QueryOptions<T> {
    /// How long an unused entry is kept before garbage collection.
    pub cache_time: Duration,
    /// How long data counts as fresh. Fresh data is served without fetching.
    pub stale_time: Duration,
    /// Disabled queries never call their fetcher.
    pub enabled: bool,
    /// Wait for the fetch to settle instead of returning the current snapshot.
    pub suspense: bool,
    /// Retries after the first failure.
    pub retry: u32,
    /// Base backoff between retries.
    pub retry_delay: Duration,
    pub on_success: Option<SuccessCallback<T>>,
    pub on_error: Option<ErrorCallback>,
    pub on_settled: Option<SettledCallback<T>>,
}

/// Backoff before retry number `attempt` (zero-based).
pub(crate) fn backoff(retry_delay: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    std::cmp::min(retry_delay.saturating_mul(factor), MAX_RETRY_DELAY)
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self {
            cache_time: DEFAULT_CACHE_TIME,
            stale_time: Duration::ZERO,
            enabled: true,
            suspense: false,
            retry: 0,
            retry_delay: Duration::from_secs(1),
            on_success: None,
            on_error: None,
            on_settled: None,
        }
    }
}

impl<T> Clone for QueryOptions<T> {
    fn clone(&self) -> Self {
        Self {
            cache_time: self.cache_time,
            stale_time: self.stale_time,
            enabled: self.enabled,
            suspense: self.suspense,
            retry: self.retry,
            retry_delay: self.retry_delay,
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            on_settled: self.on_settled.clone(),
        }
    }
}

impl<T> fmt::Debug for QueryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("cache_time", &self.cache_time)
            .field("stale_time", &self.stale_time)
            .field("enabled", &self.enabled)
            .field("suspense", &self.suspense)
            .field("retry", &self.retry)
            .field("retry_delay", &self.retry_delay)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_settled", &self.on_settled.is_some())
            .finish()
    }
}

impl<T> QueryOptions<T> {
    /// Keep the entry this long after its last use.
    pub fn cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time;
        self
    }

    /// Serve cached data without fetching while it is younger than this.
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Allow or forbid calling the fetcher.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Wait for the fetch to settle before returning.
    pub fn suspense(mut self, suspense: bool) -> Self {
        self.suspense = suspense;
        self
    }

    /// Retry a failed fetch up to this many times.
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Base delay before the first retry.
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Run `f` with the data of each successful fetch.
    pub fn on_success(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Run `f` with the error of each failed fetch.
    pub fn on_error(mut self, f: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Run `f` after each fetch, whatever the outcome.
    pub fn on_settled(
        mut self,
        f: impl Fn(Option<&T>, Option<&Error>) + Send + Sync + 'static,
    ) -> Self {
        self.on_settled = Some(Arc::new(f));
        self
    }

    /// Check the options before any work is done.
    pub fn validate(&self) -> Result<(), Error> {
        if self.retry > MAX_RETRY {
            return Err(Error::Config(format!(
                "retry must be at most {}, got {}",
                MAX_RETRY, self.retry
            )));
        }
        Ok(())
    }

    pub(crate) fn has_callbacks(&self) -> bool {
        self.on_success.is_some() || self.on_error.is_some() || self.on_settled.is_some()
    }

    /// Run the callbacks for one settled fetch.
    pub(crate) fn notify(&self, result: &Result<T, Arc<Error>>) {
        match result {
            Ok(data) => {
                if let Some(f) = &self.on_success {
                    f(data);
                }
                if let Some(f) = &self.on_settled {
                    f(Some(data), None);
                }
            }
            Err(error) => {
                if let Some(f) = &self.on_error {
                    f(error.as_ref());
                }
                if let Some(f) = &self.on_settled {
                    f(None, Some(error.as_ref()));
                }
            }
        }
    }
}
