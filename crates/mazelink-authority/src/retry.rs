//! Bounded retry with exponential backoff.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

/// How many times, and how patiently, a failed forward is retried.
///
/// Attempt `n` (1-based) that fails with a retryable error is followed by
/// a pause of `min(initial_backoff · 2^(n-1), max_backoff)` plus up to
/// half that again in random jitter, so a burst of clients retrying
/// against a restarted authority spreads out instead of arriving in
/// lockstep.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per event, including the first. Values below 1
    /// behave as 1.
    pub max_attempts: u32,

    /// Pause after the first failed attempt, in milliseconds.
    pub initial_backoff_ms: u64,

    /// Upper bound on the pause before jitter, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Total attempts, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// The un-jittered pause after failed attempt `attempt` (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// The pause after failed attempt `attempt`, with jitter applied.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter_ms = base.as_millis() as u64 / 2;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_delay_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff_ms: 50,
            max_backoff_ms: 300,
        };
        assert_eq!(policy.base_delay(1), Duration::from_millis(50));
        assert_eq!(policy.base_delay(2), Duration::from_millis(100));
        assert_eq!(policy.base_delay(3), Duration::from_millis(200));
        assert_eq!(policy.base_delay(4), Duration::from_millis(300));
        assert_eq!(policy.base_delay(40), Duration::from_millis(300));
    }

    #[test]
    fn test_jittered_delay_stays_in_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..=5 {
            let base = policy.base_delay(attempt);
            for _ in 0..50 {
                let delay = policy.delay(attempt);
                assert!(delay >= base);
                assert!(delay <= base + base / 2);
            }
        }
    }

    #[test]
    fn test_attempts_is_at_least_one() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.attempts(), 1);
        assert_eq!(RetryPolicy::none().attempts(), 1);
    }
}
