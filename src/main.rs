//! # Relay Gateway
//!
//! OpenAI-compatible relay gateway with weighted channel failover and usage
//! metering.
//!
//! ## Usage
//!
//! ```bash
//! # Start with default configuration
//! relay-gateway
//!
//! # Start with a config file holding channels and tokens
//! relay-gateway --config /path/to/gateway.yaml
//!
//! # Start with environment overrides
//! GATEWAY_PORT=9000 PROXY_RETRY_ROUNDS=2 relay-gateway
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gateway_config::{ConfigLoader, GatewayConfig};
use gateway_core::MemoryStore;
use gateway_server::{AppState, Server, ServerConfig};
use gateway_telemetry::{init_logging, LoggingConfig};
use tracing::{error, info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "relay-gateway", version, about)]
struct Args {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

/// Application entry point
#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(2);
        }
    };

    let logging = LoggingConfig::new()
        .with_level(config.logging.level.clone())
        .with_json(config.logging.json);
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting relay gateway"
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "Application failed");
        std::process::exit(1);
    }
}

async fn load(args: &Args) -> anyhow::Result<GatewayConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_file(path);
    }
    let mut config = loader.load().await?;

    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    Ok(config)
}

/// Main application logic
async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let store = Arc::new(seed_store(&config));

    info!(
        host = %config.server.host,
        port = config.server.port,
        channels = store.channel_count(),
        tokens = config.seed.tokens.len(),
        retry_rounds = config.proxy.rounds(),
        retry_delay_ms = config.proxy.retry_delay_ms,
        "Configuration loaded"
    );

    let server_config = ServerConfig::new()
        .with_host(&config.server.host)
        .with_port(config.server.port);

    let state = AppState::builder()
        .config(config)
        .store(store)
        .build()
        .context("failed to build application state")?;

    Server::new(server_config, state).run().await?;
    Ok(())
}

/// Load configured channels and tokens into a fresh in-memory store
fn seed_store(config: &GatewayConfig) -> MemoryStore {
    let store = MemoryStore::new();

    for seed in &config.seed.channels {
        store.upsert_channel(seed.to_channel());
    }
    for seed in &config.seed.tokens {
        store.insert_token(seed.key(), seed.to_token());
    }

    if config.seed.channels.is_empty() {
        warn!("No channels configured; proxy requests will fail with no_available_channels");
    }
    store
}
