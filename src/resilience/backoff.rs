//! Exponential backoff.

use std::time::Duration;

use crate::config::RetryConfig;

/// Retry schedule for upstream fetches.
///
/// Retry `n` (1-based) waits `unit * base^n`, capped at `max_delay`. The
/// defaults give 3s, 9s and 27s before the three retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub base: u32,
    pub unit: Duration,
    pub max_delay: Duration,
}

impl BackoffPolicy {
    /// Delay to wait before retry number `retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        calculate_backoff(retry, self.base, self.unit, self.max_delay)
    }

    /// Total number of attempts, first try included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base: config.backoff_base,
            unit: Duration::from_millis(config.backoff_unit_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Calculate the exponential backoff delay for a retry.
pub fn calculate_backoff(retry: u32, base: u32, unit: Duration, max: Duration) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let factor = base.max(1).saturating_pow(retry);
    unit.saturating_mul(factor).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_for(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for(2), Duration::from_secs(9));
        assert_eq!(policy.delay_for(3), Duration::from_secs(27));
    }

    #[test]
    fn test_backoff_calculation() {
        let unit = Duration::from_millis(100);
        let max = Duration::from_secs(1);

        assert_eq!(calculate_backoff(0, 2, unit, max), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 2, unit, max), Duration::from_millis(200));
        assert_eq!(calculate_backoff(2, 2, unit, max), Duration::from_millis(400));
        assert_eq!(calculate_backoff(10, 2, unit, max), max);
        assert_eq!(calculate_backoff(u32::MAX, 3, unit, max), max);
    }
}
