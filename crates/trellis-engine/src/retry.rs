//! Retry policy for transient provider failures

use std::time::Duration;

/// Bounded exponential backoff and per-call deadline
///
/// Only `Transient` provider errors are retried; `Invalid` and `Conflict`
/// (outside the Create-to-Update fallback) are not. Every provider call is
/// bounded by `call_timeout`; an elapsed call counts as a transient failure,
/// so a stalled platform can never hang a run.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Hard ceiling on any single delay
    pub max_delay: Duration,
    /// Deadline for a single provider call
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, zero delays - for tests
    pub fn immediate() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            call_timeout: Duration::from_secs(5),
        }
    }

    /// Delay after the given attempt (1-based): base * 2^(attempt-1), capped
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
