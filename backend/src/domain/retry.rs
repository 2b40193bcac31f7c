//! Bounded retry schedules and the sleeping abstraction they run on.

use std::time::Duration;

use async_trait::async_trait;

/// Growth of the delay between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `initial_delay × attempt`.
    Linear,
    /// `initial_delay × 2^(attempt - 1)`.
    Exponential,
}

/// Attempt bound and delay schedule for one retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// How the delay grows afterwards.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Linear schedule: `initial_delay`, `2 × initial_delay`, ...
    pub const fn linear(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff: Backoff::Linear,
        }
    }

    /// Doubling schedule: `initial_delay`, `2 × initial_delay`, `4 × ...`
    pub const fn exponential(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff: Backoff::Exponential,
        }
    }

    /// Attempt bound, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use ed_queue::domain::RetryPolicy;
    ///
    /// let policy = RetryPolicy::exponential(5, Duration::from_millis(100));
    /// assert_eq!(policy.delay_after(1), Duration::from_millis(100));
    /// assert_eq!(policy.delay_after(4), Duration::from_millis(800));
    /// ```
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            Backoff::Linear => self.initial_delay.saturating_mul(attempt),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                self.initial_delay.saturating_mul(factor)
            }
        }
    }
}

/// Async sleeping abstraction so retry schedules are observable in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-backed sleeper used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    //! Retry schedule arithmetic.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 300)]
    fn linear_delays_grow_by_initial_step(#[case] attempt: u32, #[case] millis: u64) {
        let policy = RetryPolicy::linear(3, Duration::from_millis(100));
        assert_eq!(policy.delay_after(attempt), Duration::from_millis(millis));
    }

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(4, 800)]
    fn exponential_delays_double(#[case] attempt: u32, #[case] millis: u64) {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(100));
        assert_eq!(policy.delay_after(attempt), Duration::from_millis(millis));
    }

    #[rstest]
    fn huge_exponents_saturate() {
        let policy = RetryPolicy::exponential(64, Duration::from_millis(100));
        assert_eq!(policy.delay_after(40), Duration::from_millis(100).saturating_mul(u32::MAX));
    }

    #[rstest]
    fn zero_attempt_bound_still_runs_once() {
        let policy = RetryPolicy::linear(0, Duration::ZERO);
        assert_eq!(policy.attempts(), 1);
    }

    #[tokio::test]
    async fn tokio_sleeper_waits_at_least_the_duration() {
        let started = std::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(5)).await;
        assert!(started.elapsed() >= Duration::from_millis(5));
    }
}
