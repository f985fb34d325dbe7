//! Integration tests for the relay gateway
//!
//! The gateway runs on a real TCP listener; upstream channels are wiremock
//! servers. Covered here:
//! - Failover across channels and rounds
//! - Usage metering for JSON, header and SSE responses
//! - Token scope and model-based channel filtering
//! - Operational endpoints and graceful shutdown

pub mod fixtures;
pub mod helpers;
pub mod mock_channels;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;
pub use mock_channels::*;

#[cfg(test)]
mod api_tests;
#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod routing_tests;
