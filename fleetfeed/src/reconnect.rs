//! Reconnect backoff policy: linear delay, bounded attempts.

use std::time::Duration;

/// Policy for re-establishing the channel after an unexpected close.
///
/// Attempt `k` (1-indexed) waits `base_delay * k` before trying — linear,
/// not exponential. Once `max_attempts` has been used up the connection
/// sequence is failed for good and the caller is expected to fall back to
/// polling.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(3000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }

    /// Whether the given attempt number is still within the budget.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_linearly() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(6));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(9));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(12));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(15));
    }

    #[test]
    fn budget_ends_after_max_attempts() {
        let policy = ReconnectPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(5));
        assert!(!policy.should_retry(6));
    }

    #[test]
    fn attempt_zero_clamps_to_base_delay() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            max_attempts: 2,
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
    }
}
