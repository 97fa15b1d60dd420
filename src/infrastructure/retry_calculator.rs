//! Retry delay calculation
//!
//! Exponential backoff for product page retries and linear backoff for
//! search page errors, both with additive random jitter.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use crate::infrastructure::config::NetworkConfig;

/// Upper bound for a single backoff wait
const MAX_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct RetryCalculator {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    backoff_multiplier: f64,
    jitter_min_ms: u64,
    jitter_max_ms: u64,
}

impl RetryCalculator {
    pub fn new(
        max_retries: u32,
        base_delay_ms: u64,
        max_delay_ms: u64,
        backoff_multiplier: f64,
        jitter_min_ms: u64,
        jitter_max_ms: u64,
    ) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            backoff_multiplier,
            jitter_min_ms: jitter_min_ms.min(jitter_max_ms),
            jitter_max_ms: jitter_max_ms.max(jitter_min_ms),
        }
    }

    pub fn from_network_config(network: &NetworkConfig) -> Self {
        Self::new(
            network.max_retries,
            network.backoff_base_ms,
            MAX_DELAY_MS,
            2.0,
            network.jitter_min_ms,
            network.jitter_max_ms,
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// `base * multiplier^(attempt-1)`, capped, plus jitter.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let exponential = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = if exponential.is_finite() {
            (exponential as u64).min(self.max_delay_ms)
        } else {
            self.max_delay_ms
        };
        Duration::from_millis(capped) + self.jitter()
    }

    /// `step * attempt` plus jitter, used between search page error retries.
    pub fn linear_delay(&self, step: Duration, attempt: u32) -> Duration {
        step.saturating_mul(attempt) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        Duration::from_millis(fastrand::u64(self.jitter_min_ms..=self.jitter_max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_delay_doubles_with_bounded_jitter() {
        let calculator = RetryCalculator::new(3, 100, 5000, 2.0, 0, 50);

        let delay1 = calculator.calculate_delay(1);
        assert!(delay1 >= Duration::from_millis(100) && delay1 <= Duration::from_millis(150));

        let delay3 = calculator.calculate_delay(3);
        assert!(delay3 >= Duration::from_millis(400) && delay3 <= Duration::from_millis(450));
    }

    #[test]
    fn delay_is_capped() {
        let calculator = RetryCalculator::new(30, 1000, 5000, 2.0, 0, 0);
        assert_eq!(calculator.calculate_delay(20), Duration::from_millis(5000));
    }

    #[test]
    fn retry_budget_is_respected() {
        let calculator = RetryCalculator::new(3, 0, 0, 2.0, 0, 0);
        assert!(calculator.should_retry(1));
        assert!(calculator.should_retry(2));
        assert!(!calculator.should_retry(3));
    }

    #[test]
    fn linear_delay_scales_with_attempt() {
        let calculator = RetryCalculator::new(3, 0, 0, 2.0, 0, 0);
        assert_eq!(
            calculator.linear_delay(Duration::from_millis(200), 3),
            Duration::from_millis(600)
        );
    }
}
