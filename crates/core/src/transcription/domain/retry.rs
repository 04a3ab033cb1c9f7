use std::time::Duration;

use crate::shared::constants::MAX_RETRIES;
use crate::transcription::domain::backend::BackendError;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry budget and backoff schedule for per-chunk backend calls.
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Box<dyn Fn(u32) -> Duration + Send + Sync>,
}

impl RetryPolicy {
    /// Doubles the wait after every failed attempt: 1s, 2s, 4s, ...
    pub fn exponential(max_attempts: u32) -> Self {
        Self::with_backoff(max_attempts, |attempt| {
            let exp = attempt.saturating_sub(1).min(30);
            MAX_BACKOFF.min(Duration::from_secs(1u64 << exp))
        })
    }

    /// No waiting between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::with_backoff(max_attempts, |_| Duration::ZERO)
    }

    pub fn with_backoff<F>(max_attempts: u32, backoff: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Box::new(backoff),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before retrying after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }

    /// Whether a failed attempt should be retried at all. Fatal errors
    /// abort regardless of remaining budget.
    pub fn is_retryable(&self, error: &BackendError) -> bool {
        error.is_transient()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(MAX_RETRIES)
    }
}
