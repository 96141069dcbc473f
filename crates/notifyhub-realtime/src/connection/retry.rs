//! Reconnect retry policy.
//!
//! The default schedule is fast-then-slow: retry immediately, then after
//! 2 s, 10 s, and every 30 s from then on.

use std::fmt;
use std::time::Duration;

/// Decides how long to wait before each reconnect attempt.
pub trait RetryPolicy: Send + Sync + fmt::Debug + 'static {
    /// Delay before retry number `retry` (0-based), or `None` to give up.
    fn next_retry_delay(&self, retry: u32) -> Option<Duration>;
}

/// A fixed schedule whose last entry repeats forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRetryPolicy {
    delays: Vec<Duration>,
}

impl ScheduledRetryPolicy {
    /// Build from explicit delays. An empty schedule retries immediately.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Build from a millisecond schedule (configuration form).
    pub fn from_millis(delays_ms: &[u64]) -> Self {
        Self::new(delays_ms.iter().copied().map(Duration::from_millis).collect())
    }
}

impl Default for ScheduledRetryPolicy {
    fn default() -> Self {
        Self::from_millis(&[0, 2_000, 10_000, 30_000])
    }
}

impl RetryPolicy for ScheduledRetryPolicy {
    fn next_retry_delay(&self, retry: u32) -> Option<Duration> {
        let index = usize::try_from(retry).unwrap_or(usize::MAX);
        Some(
            self.delays
                .get(index)
                .or_else(|| self.delays.last())
                .copied()
                .unwrap_or(Duration::ZERO),
        )
    }
}
