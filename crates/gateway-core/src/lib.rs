//! # Gateway Core
//!
//! Core types, collaborator traits, and error handling for the relay gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Channel and token records
//! - The inbound proxy request model
//! - Usage values and ledger records
//! - Store traits plus an in-memory reference store
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod error;
pub mod request;
pub mod store;
pub mod token;
pub mod usage;

// Re-export commonly used types
pub use channel::{normalize_base_url, parse_model_list, Channel, ChannelStatus};
pub use error::{GatewayError, GatewayResult};
pub use request::{ProxyRequest, X_API_KEY};
pub use store::{hash_key, ChannelDirectory, MemoryStore, TokenStore, UsageLedger};
pub use token::{Token, TokenStatus};
pub use usage::{NormalizedUsage, UsageRecord, UsageStatus};
