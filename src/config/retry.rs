use std::time::Duration;

/// Exponential backoff schedule with an optional attempt budget
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for any single delay
    pub max_backoff: Duration,

    /// Growth factor between consecutive delays
    pub multiplier: f64,

    /// Consecutive failures tolerated before giving up (`None` = retry forever)
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever with the given delay bounds
    pub fn unbounded(initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            initial_backoff,
            max_backoff,
            multiplier: 2.0,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` consecutive failures
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay to wait after the `failures`-th consecutive failure, or `None` once the budget is spent
    pub fn delay_for(&self, failures: u32) -> Option<Duration> {
        if failures == 0 {
            return Some(Duration::ZERO);
        }
        if self.max_attempts.is_some_and(|max| failures >= max) {
            return None;
        }

        let exponent = (failures - 1).min(63) as i32;
        let scaled = self.initial_backoff.as_nanos() as f64 * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff.as_nanos() as f64).max(0.0);
        Some(Duration::from_nanos(capped as u64))
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.multiplier >= 1.0
            && self.multiplier.is_finite()
            && self.initial_backoff <= self.max_backoff
            && self.max_attempts != Some(0)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_millis(100), Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially_up_to_cap() {
        let policy = RetryPolicy::unbounded(Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(1_000), Some(Duration::from_millis(500)));
    }

    #[test]
    fn budget_is_exhausted_after_max_attempts() {
        let policy = RetryPolicy::unbounded(Duration::from_millis(10), Duration::from_secs(1))
            .with_max_attempts(3);

        assert!(policy.delay_for(1).is_some());
        assert!(policy.delay_for(2).is_some());
        assert!(policy.delay_for(3).is_none());
    }

    #[test]
    fn invalid_policies_are_detected() {
        assert!(RetryPolicy::default().is_valid());
        assert!(!RetryPolicy::default().with_multiplier(0.5).is_valid());
        assert!(!RetryPolicy::default().with_max_attempts(0).is_valid());
        assert!(
            !RetryPolicy::unbounded(Duration::from_secs(2), Duration::from_secs(1)).is_valid()
        );
    }
}
