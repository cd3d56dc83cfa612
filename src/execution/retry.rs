//! Retry policy with exponential backoff

use crate::config::Config;
use crate::execution::error_classifier::ErrorClass;
use std::time::Duration;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per strategy, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            ..Self::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_attempts, config.initial_backoff)
    }

    /// Delay after the given failed attempt (1-based): initial, 2x, 4x, ...
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let delay_ms = (self.initial_delay.as_millis() as f64) * self.backoff_multiplier.powi(exponent);
        let delay_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(delay_ms as u64)
    }
}

/// Retry bookkeeping for one strategy within one execute() call
#[derive(Debug, Clone)]
pub struct RetryState {
    pub attempt: u32,
    pub next_delay: Duration,
    pub last_error: Option<ErrorClass>,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            next_delay: policy.initial_delay,
            last_error: None,
        }
    }

    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Record a failure; `Some(delay)` when another attempt should follow
    pub fn record_failure(&mut self, policy: &RetryPolicy, class: ErrorClass) -> Option<Duration> {
        self.last_error = Some(class);
        if !class.is_retryable() || self.attempt >= policy.max_attempts {
            return None;
        }
        self.next_delay = policy.delay_for_attempt(self.attempt);
        Some(self.next_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::new(10, Duration::from_secs(20));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_state_stops_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let mut state = RetryState::new(&policy);
        state.begin_attempt();
        assert_eq!(state.record_failure(&policy, ErrorClass::Timeout), Some(Duration::from_millis(10)));
        state.begin_attempt();
        assert_eq!(state.record_failure(&policy, ErrorClass::Timeout), Some(Duration::from_millis(20)));
        state.begin_attempt();
        assert_eq!(state.record_failure(&policy, ErrorClass::Timeout), None);
        assert_eq!(state.last_error, Some(ErrorClass::Timeout));
    }

    #[test]
    fn test_non_retryable_stops_immediately() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::new(&policy);
        state.begin_attempt();
        assert_eq!(state.record_failure(&policy, ErrorClass::Authentication), None);
    }
}
