//! Round-based retry policy.
//!
//! A round is one pass over the ordered channel list. Another round is only
//! started when the previous one saw a retryable outcome, after a fixed delay.

use std::time::Duration;

use http::StatusCode;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Number of passes over the channel list, at least 1
    pub rounds: u32,
    /// Pause between rounds
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            rounds: 1,
            delay: Duration::from_millis(200),
        }
    }
}

/// Retry policy implementation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy; `rounds` is coerced to at least 1
    #[must_use]
    pub fn new(mut config: RetryConfig) -> Self {
        config.rounds = config.rounds.max(1);
        Self { config }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Number of rounds
    #[must_use]
    pub fn rounds(&self) -> u32 {
        self.config.rounds
    }

    /// Delay before the next round
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.config.delay
    }

    /// Whether another round follows `round` (0-indexed)
    #[must_use]
    pub fn has_round_after(&self, round: u32) -> bool {
        round + 1 < self.config.rounds
    }

    /// Check if an upstream status warrants trying again: 408, 429 and 5xx
    #[must_use]
    pub fn is_retryable_status(status: StatusCode) -> bool {
        status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

/// Builder for retry policy
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    config: RetryConfig,
}

impl RetryPolicyBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of rounds
    #[must_use]
    pub fn rounds(mut self, rounds: u32) -> Self {
        self.config.rounds = rounds;
        self
    }

    /// Set the delay between rounds
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    /// Build the policy
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        RetryPolicy::new(self.config)
    }
}
