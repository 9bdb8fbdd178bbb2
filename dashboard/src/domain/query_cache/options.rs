//! Per-subscription fetch policy.

use std::time::Duration;

/// Freshness and retry policy applied to one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// How long a settled value counts as fresh.
    pub stale_time: Duration,
    /// Automatic retries after a retryable failure (excluding the first call).
    pub retry_count: u32,
    /// Whether regaining application focus refetches stale entries.
    pub refetch_on_focus_regain: bool,
    /// Delay before the first retry.
    pub retry_initial_backoff: Duration,
    /// Upper bound for retry delays.
    pub retry_max_backoff: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(60),
            retry_count: 2,
            refetch_on_focus_regain: false,
            retry_initial_backoff: Duration::from_secs(1),
            retry_max_backoff: Duration::from_secs(30),
        }
    }
}

impl FetchOptions {
    /// Delay before retry number `attempt` (1-based), doubling per attempt.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use dashboard::domain::query_cache::FetchOptions;
    ///
    /// let options = FetchOptions::default();
    /// assert_eq!(options.retry_delay(1), Duration::from_secs(1));
    /// assert_eq!(options.retry_delay(2), Duration::from_secs(2));
    /// assert_eq!(options.retry_delay(10), Duration::from_secs(30));
    /// ```
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.retry_initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.retry_max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }

    /// Total gateway calls allowed for one fetch.
    pub const fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}
