// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy for handler invocations
//!
//! The delay between attempts is fixed, with no backoff.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = single attempt)
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Whether a failure on `attempt` (0-indexed) earns another try
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Wait before the attempt following `attempt`
    pub fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.delay
    }

    /// Upper bound on attempts for one invocation
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
