//! # Gateway Server
//!
//! HTTP server for the relay gateway.
//!
//! This crate provides:
//! - Axum-based HTTP server with the `/v1` proxy mount
//! - Caller token authentication
//! - reqwest upstream transport plugged into the failover loop
//! - Streamed response relay with background usage metering
//! - Health, readiness, metrics and model listing endpoints
//! - Graceful shutdown that drains pending metering

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metering;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod upstream;

// Re-export main types
pub use auth::AuthenticatedToken;
pub use error::ApiError;
pub use handlers::{aggregate_models, HealthResponse, ModelsResponse};
pub use metering::MeteringTasks;
pub use routes::create_router;
pub use server::{Server, ServerConfig, ServerError};
pub use shutdown::shutdown_signal;
pub use state::{AppState, AppStateBuilder, StateError};
pub use upstream::{HttpUpstream, UpstreamReply};
