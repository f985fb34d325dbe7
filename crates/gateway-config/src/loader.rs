//! Layered configuration loading.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use crate::config::GatewayConfig;

/// Environment variables read by the loader
pub const ENV_HOST: &str = "GATEWAY_HOST";
/// Bind port override
pub const ENV_PORT: &str = "GATEWAY_PORT";
/// Retry rounds override
pub const ENV_RETRY_ROUNDS: &str = "PROXY_RETRY_ROUNDS";
/// Retry delay override, in milliseconds
pub const ENV_RETRY_DELAY_MS: &str = "PROXY_RETRY_DELAY_MS";
/// Log level override
pub const ENV_LOG_LEVEL: &str = "GATEWAY_LOG_LEVEL";
/// JSON log toggle
pub const ENV_LOG_JSON: &str = "GATEWAY_LOG_JSON";

type EnvSource = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds a [`GatewayConfig`] from defaults, an optional file and the environment
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<EnvSource>,
}

impl ConfigLoader {
    /// Loader reading the process environment and no file
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: None,
            env: Some(Box::new(|name| std::env::var(name).ok())),
        }
    }

    /// Read this file after the defaults
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Replace the environment lookup
    #[must_use]
    pub fn with_env_source<F>(mut self, source: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Some(Box::new(source));
        self
    }

    /// Ignore the environment entirely
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.env = None;
        self
    }

    /// Load, apply overrides and validate
    pub async fn load(self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.file {
            Some(path) => {
                let config = read_file(path).await?;
                info!(path = %path.display(), "Loaded configuration file");
                config
            }
            None => GatewayConfig::default(),
        };

        if let Some(env) = &self.env {
            apply_env(&mut config, env.as_ref())?;
        }

        validate(&config)?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("file", &self.file)
            .field("env", &self.env.is_some())
            .finish()
    }
}

/// Load configuration from an optional file plus the process environment
pub async fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader.with_file(path);
    }
    loader.load().await
}

async fn read_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&text).map_err(|e| parse_error(e.to_string())),
        Some("json") => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string())),
        _ => serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string())),
    }
}

fn apply_env(
    config: &mut GatewayConfig,
    env: &(dyn Fn(&str) -> Option<String> + Send + Sync),
) -> Result<(), ConfigError> {
    let lookup = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(host) = lookup(ENV_HOST) {
        config.server.host = host;
    }
    if let Some(port) = lookup(ENV_PORT) {
        config.server.port = parse_env(ENV_PORT, &port)?;
    }
    if let Some(rounds) = lookup(ENV_RETRY_ROUNDS) {
        config.proxy.retry_rounds = parse_env(ENV_RETRY_ROUNDS, &rounds)?;
    }
    if let Some(delay) = lookup(ENV_RETRY_DELAY_MS) {
        config.proxy.retry_delay_ms = parse_env(ENV_RETRY_DELAY_MS, &delay)?;
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    if let Some(json) = lookup(ENV_LOG_JSON) {
        config.logging.json = match json.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::Env {
                    var: ENV_LOG_JSON,
                    value: json,
                })
            }
        };
    }

    debug!(
        host = %config.server.host,
        port = config.server.port,
        retry_rounds = config.proxy.retry_rounds,
        retry_delay_ms = config.proxy.retry_delay_ms,
        "Applied environment overrides"
    );
    Ok(())
}

fn parse_env<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}

fn validate(config: &GatewayConfig) -> Result<(), ConfigError> {
    let mut problems = Vec::new();
    if config.server.host.trim().is_empty() {
        problems.push("server.host must not be empty".to_string());
    }
    if config.server.max_body_bytes == 0 {
        problems.push("server.max_body_bytes must be positive".to_string());
    }
    if config.logging.level.trim().is_empty() {
        problems.push("logging.level must not be empty".to_string());
    }
    problems.extend(config.seed.validate());

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(problems.join("; ")))
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The file did not parse
    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        /// File path
        path: PathBuf,
        /// Parser message
        message: String,
    },
    /// An environment override did not parse
    #[error("invalid value '{value}' for {var}")]
    Env {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
    /// Semantic validation failed
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
