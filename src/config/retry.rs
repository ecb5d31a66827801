//! Retry, timeout and fallback configuration for external calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff: attempt `k` (0-based) that fails waits `min_delay_ms * factor^k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub retries: u32,
    pub min_delay_ms: u64,
    pub factor: f64,
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.retries.max(1)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = self.min_delay_ms as f64 * self.factor.powi(attempt as i32);
        Duration::from_millis(ms.max(0.0).round() as u64)
    }

    /// Same policy with a single attempt (no waiting)
    pub fn single_attempt(&self) -> Self {
        Self {
            retries: 1,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub capture: RetryPolicy,
    pub analysis: RetryPolicy,
}

pub const RETRY: RetrySettings = RetrySettings {
    capture: RetryPolicy {
        retries: 2,
        min_delay_ms: 500,
        factor: 2.0,
    },
    analysis: RetryPolicy {
        retries: 3,
        min_delay_ms: 1000,
        factor: 2.0,
    },
};

/// Per external call. There is no timeout on the run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    pub capture_ms: u64,
    pub analysis_ms: u64,
}

impl TimeoutSettings {
    pub fn capture(&self) -> Duration {
        Duration::from_millis(self.capture_ms)
    }

    pub fn analysis(&self) -> Duration {
        Duration::from_millis(self.analysis_ms)
    }
}

pub const TIMEOUTS: TimeoutSettings = TimeoutSettings {
    capture_ms: 30_000,
    analysis_ms: 90_000,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackSettings {
    /// Substitute the offline heuristic when the AI provider is unavailable
    pub enabled: bool,
    /// Confidence stamped on heuristic results (kept low on purpose)
    pub confidence: f64,
}

pub const FALLBACK: FallbackSettings = FallbackSettings {
    enabled: true,
    confidence: 0.3,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_exponentially() {
        let policy = RetryPolicy {
            retries: 4,
            min_delay_ms: 100,
            factor: 2.0,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        let policy = RetryPolicy {
            retries: 0,
            min_delay_ms: 1,
            factor: 1.0,
        };
        assert_eq!(policy.attempts(), 1);
    }
}
