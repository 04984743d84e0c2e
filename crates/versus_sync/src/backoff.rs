//! Exponential backoff for reconnect attempts.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct BackoffPolicy {
    /// Whether to reconnect at all after the connection drops.
    enabled: bool,
    /// First delay, in milliseconds.
    initial_delay_ms: u64,
    /// Upper bound on any delay, in milliseconds.
    max_delay_ms: u64,
    /// Growth factor between attempts.
    factor: f64,
    /// Give up after this many attempts; `None` retries forever.
    max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            factor: 2.0,
            max_attempts: Some(10),
        }
    }
}

/// Stateful delay sequence for one outage.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    /// Starts a fresh sequence.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Attempts made since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt, or `None` when the policy gives up.
    #[instrument(skip(self), fields(attempt = self.attempt))]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.policy.enabled {
            return None;
        }
        if let Some(max) = self.policy.max_attempts
            && self.attempt >= max
        {
            debug!(max, "Reconnect attempts exhausted");
            return None;
        }
        let factor = self.policy.factor.max(1.0);
        let raw = self.policy.initial_delay_ms as f64 * factor.powi(self.attempt as i32);
        let capped = raw.min(self.policy.max_delay_ms as f64);
        self.attempt += 1;
        let delay = Duration::from_millis(capped as u64);
        debug!(delay_ms = delay.as_millis() as u64, "Next reconnect delay");
        Some(delay)
    }

    /// Starts over after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
