//! Retry configuration and dead letter handling for redelivery.

use std::time::Duration;

/// Exponential backoff schedule for failed receive jobs.
///
/// Remote inboxes fail for hours at a time; the schedule starts at a
/// minute and stretches toward a day before a job is given up on.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts before dead-lettering.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling on the delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(3600 * 12),
        }
    }
}

impl RetryConfig {
    /// Delay for the given attempt number (0-indexed), doubling each
    /// attempt up to the ceiling.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.min(31);
        let delay = self
            .base_delay
            .saturating_mul(1_u32.checked_shl(shift).unwrap_or(u32::MAX));
        delay.min(self.max_delay)
    }

    /// Whether another attempt should be made.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Record of a job that exhausted its retries.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry<T> {
    /// The failed job.
    pub job: T,
    /// Number of attempts made.
    pub attempts: u32,
    /// Last error message.
    pub last_error: String,
    /// Timestamp of the final failure.
    pub failed_at: chrono::DateTime<chrono::Utc>,
}

impl<T> DeadLetterEntry<T> {
    /// Create a new dead letter entry.
    pub fn new(job: T, attempts: u32, last_error: String) -> Self {
        Self {
            job,
            attempts,
            last_error,
            failed_at: chrono::Utc::now(),
        }
    }
}
