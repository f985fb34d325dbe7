//! # Gateway Telemetry
//!
//! Usage metering and observability for the relay gateway.
//!
//! This crate provides:
//! - Usage extraction from JSON bodies, response headers and SSE streams
//! - The usage recorder (ledger append plus quota increment)
//! - Prometheus metrics
//! - Structured logging

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod recorder;
pub mod usage;

// Re-export main types
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use metrics::{Metrics, MetricsConfig, MetricsError};
pub use recorder::{PendingUsage, UsageRecorder};
pub use usage::{
    usage_from_headers, usage_from_json, usage_from_slice, usage_from_sse_stream, SseUsageScanner,
    UsageSource,
};
