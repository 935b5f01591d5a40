//! Retry decisions for failed inference attempts.
//!
//! [`RetryPolicy::decide`] is a pure function: it never sleeps and never
//! calls the worker. The orchestrator owns the loop and the waiting.

use std::time::Duration;

use carta_core::Error;
use serde::{Deserialize, Serialize};

/// Configuration for retry behavior on failed attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts in total, including the first one.
    pub max_attempts: u32,
    /// Delay after attempt `i` is `backoff[i]`; the last entry is reused.
    pub backoff: Vec<Duration>,
    /// Absolute budget for a request, measured from its start.
    pub deadline: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(20),
            ],
            deadline: Duration::from_secs(300),
        }
    }
}

impl RetryConfig {
    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff schedule.
    pub fn with_backoff(mut self, backoff: impl Into<Vec<Duration>>) -> Self {
        self.backoff = backoff.into();
        self
    }

    /// Set the overall deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Why no further attempt is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The error classification does not allow a retry.
    NonRetryable,
    /// The attempt budget is spent.
    AttemptsExhausted,
    /// The deadline is reached, or would be reached during the backoff.
    DeadlineExceeded,
}

/// Outcome of [`RetryPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up and surface the error.
    Stop(StopReason),
    /// Wait this long, then try again.
    RetryAfter(Duration),
}

/// Pure retry decision engine.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a policy from its configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Returns the overall deadline.
    #[inline]
    pub fn deadline(&self) -> Duration {
        self.config.deadline
    }

    /// Returns the maximum number of attempts.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Decides what to do after attempt `attempt` (zero-based) failed.
    ///
    /// `elapsed` is the time since the request started. A retry that would
    /// start at or after the deadline is never scheduled.
    pub fn decide(&self, attempt: u32, error: &Error, elapsed: Duration) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::Stop(StopReason::NonRetryable);
        }

        if attempt.saturating_add(1) >= self.config.max_attempts {
            return RetryDecision::Stop(StopReason::AttemptsExhausted);
        }

        let delay = self.backoff_for(attempt);
        if elapsed.saturating_add(delay) >= self.config.deadline {
            return RetryDecision::Stop(StopReason::DeadlineExceeded);
        }

        RetryDecision::RetryAfter(delay)
    }

    /// Delay scheduled after attempt `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let schedule = &self.config.backoff;
        usize::try_from(attempt)
            .ok()
            .and_then(|index| schedule.get(index))
            .or_else(|| schedule.last())
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> Error {
        Error::transient("connection refused")
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff[0], Duration::from_secs(5));
        assert_eq!(config.deadline, Duration::from_secs(300));
    }

    #[test]
    fn retries_transient_errors_with_schedule() {
        let policy = RetryPolicy::default();

        assert_eq!(
            policy.decide(0, &transient(), Duration::ZERO),
            RetryDecision::RetryAfter(Duration::from_secs(5))
        );
        assert_eq!(
            policy.decide(1, &transient(), Duration::from_secs(6)),
            RetryDecision::RetryAfter(Duration::from_secs(10))
        );
    }

    #[test]
    fn stops_on_last_attempt() {
        let policy = RetryPolicy::default();
        for elapsed in [Duration::ZERO, Duration::from_secs(30), Duration::from_secs(299)] {
            assert_eq!(
                policy.decide(2, &transient(), elapsed),
                RetryDecision::Stop(StopReason::AttemptsExhausted)
            );
        }
    }

    #[test]
    fn stops_on_non_retryable() {
        let policy = RetryPolicy::default();
        let errors = [
            Error::validation("bad side"),
            Error::worker_unavailable("not loaded"),
            Error::inference_failure("no JSON"),
            Error::timeout("deadline"),
            Error::internal("panic"),
        ];

        for error in &errors {
            assert_eq!(
                policy.decide(0, error, Duration::ZERO),
                RetryDecision::Stop(StopReason::NonRetryable)
            );
        }
    }

    #[test]
    fn stops_when_deadline_is_spent() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(0, &transient(), Duration::from_secs(300)),
            RetryDecision::Stop(StopReason::DeadlineExceeded)
        );
    }

    #[test]
    fn stops_when_backoff_would_cross_deadline() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(0, &transient(), Duration::from_secs(296)),
            RetryDecision::Stop(StopReason::DeadlineExceeded)
        );
        assert_eq!(
            policy.decide(0, &transient(), Duration::from_secs(294)),
            RetryDecision::RetryAfter(Duration::from_secs(5))
        );
    }

    #[test]
    fn backoff_ending_at_deadline_stops() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(0, &transient(), Duration::from_secs(295)),
            RetryDecision::Stop(StopReason::DeadlineExceeded)
        );
    }

    #[test]
    fn short_schedule_reuses_last_delay() {
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .with_max_attempts(5)
                .with_backoff(vec![Duration::from_secs(1), Duration::from_secs(2)]),
        );

        assert_eq!(policy.backoff_for(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(2));
        assert_eq!(
            policy.decide(3, &transient(), Duration::ZERO),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
    }

    #[test]
    fn no_retry_stops_immediately() {
        let policy = RetryPolicy::new(RetryConfig::no_retry());
        assert_eq!(
            policy.decide(0, &transient(), Duration::ZERO),
            RetryDecision::Stop(StopReason::AttemptsExhausted)
        );
    }
}
