// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry backoff policy.
//!
//! A [`BackoffStrategy`] computes the delay before the next delivery
//! attempt from the number of failed attempts so far: below the
//! `min_retries` threshold the minimum delay applies, beyond it the delay
//! doubles per attempt, clamped to the strategy's range and wait cap, with
//! ±50% uniform jitter so retrying installs don't resynchronize.

use std::time::Duration;

use rand::Rng;

/// Immutable backoff configuration, selected once at construction from the
/// named strategies below.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffStrategy {
    name: &'static str,
    min_retries: u32,
    min_range: Duration,
    max_range: Duration,
    max_wait: Duration,
    jitter: bool,
    no_retry: bool,
}

impl BackoffStrategy {
    /// Main package queue: start at two minutes, cap an individual wait at
    /// one hour.
    pub fn long_wait() -> Self {
        BackoffStrategy {
            name: "long_wait",
            min_retries: 1,
            min_range: Duration::from_secs(120),
            max_range: Duration::from_secs(60 * 60 * 24),
            max_wait: Duration::from_secs(3600),
            jitter: true,
            no_retry: false,
        }
    }

    /// Click queue and attribution fetches: fast first retries.
    pub fn short_wait() -> Self {
        BackoffStrategy {
            name: "short_wait",
            min_retries: 1,
            min_range: Duration::from_millis(200),
            max_range: Duration::from_secs(3600),
            max_wait: Duration::from_secs(900),
            jitter: true,
            no_retry: false,
        }
    }

    /// Deterministic sub-second delays for tests.
    pub fn test_wait() -> Self {
        BackoffStrategy {
            name: "test_wait",
            min_retries: 1,
            min_range: Duration::from_millis(200),
            max_range: Duration::from_millis(500),
            max_wait: Duration::from_millis(500),
            jitter: false,
            no_retry: false,
        }
    }

    /// Retry immediately, without delay.
    pub fn no_wait() -> Self {
        BackoffStrategy {
            name: "no_wait",
            min_retries: 0,
            min_range: Duration::ZERO,
            max_range: Duration::ZERO,
            max_wait: Duration::ZERO,
            jitter: false,
            no_retry: false,
        }
    }

    /// Treat every failure as terminal regardless of its HTTP classification.
    pub fn no_retry() -> Self {
        BackoffStrategy {
            name: "no_retry",
            min_retries: 0,
            min_range: Duration::ZERO,
            max_range: Duration::ZERO,
            max_wait: Duration::ZERO,
            jitter: false,
            no_retry: true,
        }
    }

    /// Look a strategy up by its config name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "long_wait" => Some(Self::long_wait()),
            "short_wait" => Some(Self::short_wait()),
            "test_wait" => Some(Self::test_wait()),
            "no_wait" => Some(Self::no_wait()),
            "no_retry" => Some(Self::no_retry()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the caller must drop the package on any failure.
    pub fn is_no_retry(&self) -> bool {
        self.no_retry
    }

    /// Delay before attempt number `retries + 1`.
    pub fn delay_for(&self, retries: u32) -> Duration {
        if self.no_retry || self.max_wait.is_zero() {
            return Duration::ZERO;
        }
        if retries < self.min_retries {
            return self.min_range;
        }

        let exponent = (retries - self.min_retries).min(62);
        let base = self.min_range.as_secs_f64() * 2f64.powi(exponent as i32);
        let clamped = base
            .clamp(self.min_range.as_secs_f64(), self.max_range.as_secs_f64())
            .min(self.max_wait.as_secs_f64());

        if self.jitter {
            // ±50%: multiply by a uniform factor in [0.5, 1.5).
            let factor = rand::thread_rng().gen_range(0.5..1.5);
            Duration::from_secs_f64(clamped * factor)
        } else {
            Duration::from_secs_f64(clamped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_min_retries_uses_min_range() {
        let strategy = BackoffStrategy::long_wait();
        assert_eq!(strategy.delay_for(0), Duration::from_secs(120));
    }

    #[test]
    fn delay_doubles_within_jitter_bounds() {
        let strategy = BackoffStrategy::long_wait();
        // retries=2 -> base 120 * 2^1 = 240s, jittered to [120, 360).
        for _ in 0..100 {
            let delay = strategy.delay_for(2).as_secs_f64();
            assert!((120.0..360.0).contains(&delay), "delay {delay} out of bounds");
        }
    }

    #[test]
    fn delay_clamped_to_max_wait() {
        let strategy = BackoffStrategy::long_wait();
        // Huge retry count: base overflows the range, capped at 3600s, then
        // jittered to at most 1.5x.
        for _ in 0..100 {
            let delay = strategy.delay_for(40).as_secs_f64();
            assert!(delay < 3600.0 * 1.5);
            assert!(delay >= 3600.0 * 0.5);
        }
    }

    #[test]
    fn test_wait_is_deterministic() {
        let strategy = BackoffStrategy::test_wait();
        assert_eq!(strategy.delay_for(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for(2), Duration::from_millis(400));
        assert_eq!(strategy.delay_for(3), Duration::from_millis(500));
    }

    #[test]
    fn no_wait_is_always_zero() {
        let strategy = BackoffStrategy::no_wait();
        assert_eq!(strategy.delay_for(0), Duration::ZERO);
        assert_eq!(strategy.delay_for(100), Duration::ZERO);
        assert!(!strategy.is_no_retry());
    }

    #[test]
    fn no_retry_signals_terminal() {
        let strategy = BackoffStrategy::no_retry();
        assert!(strategy.is_no_retry());
        assert_eq!(strategy.delay_for(5), Duration::ZERO);
    }

    #[test]
    fn by_name_resolves_all_strategies() {
        for name in ["long_wait", "short_wait", "test_wait", "no_wait", "no_retry"] {
            let strategy = BackoffStrategy::by_name(name).expect("known strategy");
            assert_eq!(strategy.name(), name);
        }
        assert!(BackoffStrategy::by_name("bogus").is_none());
    }

    #[test]
    fn huge_retry_count_does_not_overflow() {
        let strategy = BackoffStrategy::short_wait();
        let delay = strategy.delay_for(u32::MAX);
        assert!(delay <= Duration::from_secs_f64(900.0 * 1.5));
    }
}
