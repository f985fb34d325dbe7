//! Configuration types and defaults.

use std::time::Duration;

use serde::Deserialize;

use crate::seed::SeedConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Listener settings
    pub server: ServerSettings,
    /// Failover settings
    pub proxy: ProxySettings,
    /// Log output settings
    pub logging: LoggingSettings,
    /// Background metering settings
    pub metering: MeteringSettings,
    /// Channels and tokens loaded into the in-memory store at startup
    pub seed: SeedConfig,
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ServerSettings {
    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Failover settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxySettings {
    /// Passes over the channel list; values below 1 are treated as 1
    pub retry_rounds: u32,
    /// Pause between rounds
    pub retry_delay_ms: u64,
    /// TCP connect timeout for upstream calls
    pub upstream_connect_timeout_ms: u64,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            retry_rounds: 1,
            retry_delay_ms: 200,
            upstream_connect_timeout_ms: 10_000,
        }
    }
}

impl ProxySettings {
    /// Rounds, never below 1
    #[must_use]
    pub fn rounds(&self) -> u32 {
        self.retry_rounds.max(1)
    }

    /// Delay between rounds
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Connect timeout
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_connect_timeout_ms)
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Filter directive
    pub level: String,
    /// JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Background metering settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeteringSettings {
    /// How long shutdown waits for in-flight stream metering
    pub drain_timeout_ms: u64,
}

impl Default for MeteringSettings {
    fn default() -> Self {
        Self {
            drain_timeout_ms: 10_000,
        }
    }
}

impl MeteringSettings {
    /// Drain timeout
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}
