use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::RetryPolicy;

/// Consecutive-failure tracker over a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    policy: RetryPolicy,
    failures: u32,
}

impl Backoff {
    pub(crate) fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Record a failure; returns the delay before retrying, or `None` once the budget is spent
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        self.policy.delay_for(self.failures)
    }

    pub(crate) fn failures(&self) -> u32 {
        self.failures
    }

    pub(crate) fn reset(&mut self) {
        self.failures = 0;
    }
}

/// Sleep for `delay`; returns `true` if `shutdown` fired first
pub(crate) async fn sleep_or_cancelled(delay: Duration, shutdown: &CancellationToken) -> bool {
    if delay.is_zero() {
        return shutdown.is_cancelled();
    }

    tokio::select! {
        biased;
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_failures_and_resets() {
        let mut backoff = Backoff::new(
            RetryPolicy::unbounded(Duration::from_millis(10), Duration::from_millis(40))
                .with_max_attempts(3),
        );

        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(10)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(20)));
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.failures(), 3);

        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_cancellation() {
        let token = CancellationToken::new();
        assert!(!sleep_or_cancelled(Duration::from_secs(5), &token).await);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_cut_short_by_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(sleep_or_cancelled(Duration::from_secs(3600), &token).await);
    }
}
