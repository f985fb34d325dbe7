//! # Gateway Config
//!
//! Configuration for the relay gateway.
//!
//! Values are layered: built-in defaults, then an optional YAML/TOML/JSON
//! file, then environment variables. The file may also seed channels and
//! tokens into the in-memory store.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod loader;
pub mod seed;

// Re-export main types
pub use config::{
    GatewayConfig, LoggingSettings, MeteringSettings, ProxySettings, ServerSettings,
};
pub use loader::{load_config, ConfigError, ConfigLoader};
pub use seed::{ChannelSeed, SeedConfig, TokenSeed};
