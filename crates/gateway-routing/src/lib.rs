//! # Gateway Routing
//!
//! Channel selection for the relay gateway.
//!
//! This crate provides:
//! - Eligibility filtering by status, token scope and requested model
//! - Weighted random ordering without replacement
//! - A router combining both into a per-request attempt order

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod eligibility;
pub mod router;
pub mod selector;

// Re-export main types
pub use eligibility::eligible_channels;
pub use router::ChannelRouter;
pub use selector::{weighted_order, RandomSource, SeededRandom, ThreadRandom};
