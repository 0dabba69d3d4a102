//! Bounded exponential backoff for upstream reconnection

use std::time::Duration;

/// Reconnection delay schedule
///
/// Delays start at `initial` and double on each attempt, capped at `max`.
#[derive(Debug, Clone)]
pub struct ReconnectStrategy {
    initial: Duration,
    max: Duration,
    attempt: u32,
}

impl ReconnectStrategy {
    /// Create a strategy; `max` is raised to `initial` if smaller
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            attempt: 0,
        }
    }

    /// Delay before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(16));
        self.attempt = self.attempt.saturating_add(1);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Forget past failures after a successful connect
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Failed attempts since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Default for ReconnectStrategy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}
