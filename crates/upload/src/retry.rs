use std::time::Duration;

/// Exponential backoff schedule for transient upload failures.
///
/// The delay before retry `i` (0-based) is
/// `min(initial_delay * 2^i, max_delay)`. No jitter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before retry number `retry` (0-based).
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// The full sequence of delays a session sleeps through when every
    /// attempt fails transiently.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|i| self.delay_for_attempt(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.schedule(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            max_retries: 8,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
        };
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(32));
        assert_eq!(policy.delay_for_attempt(6), Duration::from_secs(32));
        assert_eq!(policy.delay_for_attempt(200), Duration::from_secs(32));
    }

    #[test]
    fn schedule_is_monotonic() {
        let policy = RetryPolicy {
            max_retries: 12,
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(10),
        };
        let schedule = policy.schedule();
        assert_eq!(schedule.len(), 12);
        assert!(schedule.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(schedule[0], Duration::from_millis(300));
        assert_eq!(*schedule.last().unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn zero_retries_has_empty_schedule() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        assert!(policy.schedule().is_empty());
    }
}
