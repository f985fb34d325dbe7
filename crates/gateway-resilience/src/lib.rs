//! # Gateway Resilience
//!
//! Resilience patterns for the relay gateway:
//! - Round-based retry policy with a fixed inter-round delay
//! - Sequential multi-channel failover over a pluggable upstream transport

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod failover;
pub mod retry;

// Re-export main types
pub use failover::{
    FailoverOrchestrator, FailoverOutcome, Upstream, UpstreamCall, UpstreamError, UpstreamResponse,
};
pub use retry::{RetryConfig, RetryPolicy, RetryPolicyBuilder};
