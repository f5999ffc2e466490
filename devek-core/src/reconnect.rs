//! Reconnection policy with bounded attempts and linear backoff

use std::time::Duration;

use crate::config::{MAX_BACKOFF_MULTIPLIER, MAX_RECONNECT_ATTEMPTS, RECONNECT_INTERVAL};

/// Policy for retrying a failed connection.
///
/// Attempt `n` (1-indexed) waits `base * min(n, max_multiplier)`. After
/// `max_attempts` retries the policy refuses until [`reset`](Self::reset)
/// is called, which happens on every successful open and on manual retry.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    base_interval: Duration,
    max_multiplier: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnect policy
    ///
    /// - `max_attempts`: retries allowed before the user must intervene
    /// - `base_interval`: delay of the first retry
    /// - `max_multiplier`: cap on the linear growth of the delay
    pub fn new(max_attempts: u32, base_interval: Duration, max_multiplier: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_interval,
            max_multiplier: max_multiplier.max(1),
        }
    }

    /// Default policy: 5 attempts, 5s base, capped at 15s
    pub fn default_policy() -> Self {
        Self::new(
            MAX_RECONNECT_ATTEMPTS,
            RECONNECT_INTERVAL,
            MAX_BACKOFF_MULTIPLIER,
        )
    }

    /// Delay before the given 1-indexed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_interval * attempt.clamp(1, self.max_multiplier)
    }

    /// Whether another automatic attempt is allowed.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Consume one attempt and return its delay.
    ///
    /// Returns `None` once the attempt budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.can_retry() {
            return None;
        }
        self.attempts += 1;
        Some(self.delay_for_attempt(self.attempts))
    }

    /// Reset after a successful open or a manual retry
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts consumed since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::default_policy()
    }
}
