//! Retry policy for recoverable failures
//!
//! Exponential backoff with jitter. The defaults implement the in-node
//! contract: at most two retries, one second then two, with node timeouts
//! allowed a single retry before they escalate.

use rand::Rng;
use std::time::Duration;

/// Backoff configuration for retrying a failed operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,

    /// Retries allowed when the failure was a timeout
    pub max_timeout_retries: usize,

    /// First delay in seconds
    pub initial_interval: f64,

    /// Multiplier applied per retry
    pub backoff_factor: f64,

    /// Randomize delays to avoid lockstep retries
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            max_timeout_retries: 1,
            initial_interval: 1.0,
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-indexed)
    pub fn delay(&self, retry: usize) -> Duration {
        let base = self.initial_interval * self.backoff_factor.powi(retry as i32);
        let seconds = if self.jitter {
            base * rand::thread_rng().gen_range(0.5..=1.5)
        } else {
            base
        };
        Duration::from_secs_f64(seconds)
    }

    /// Whether another retry is allowed
    pub fn allows(&self, retries_done: usize, was_timeout: bool) -> bool {
        let budget = if was_timeout {
            self.max_timeout_retries
        } else {
            self.max_retries
        };
        retries_done < budget
    }

    /// Disable jitter (tests want deterministic delays)
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(0, false));
        assert!(policy.allows(1, false));
        assert!(!policy.allows(2, false));

        assert!(policy.allows(0, true));
        assert!(!policy.allows(1, true));
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = RetryPolicy::default().without_jitter();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.delay(0).as_secs_f64();
            assert!((0.5..=1.5).contains(&delay), "delay out of band: {delay}");
        }
    }
}
