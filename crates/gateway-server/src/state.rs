//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use gateway_config::GatewayConfig;
use gateway_core::{ChannelDirectory, MemoryStore, TokenStore, UsageLedger};
use gateway_resilience::{FailoverOrchestrator, RetryConfig, RetryPolicy};
use gateway_routing::ChannelRouter;
use gateway_telemetry::{Metrics, MetricsConfig, MetricsError, UsageRecorder};

use crate::metering::MeteringTasks;
use crate::upstream::HttpUpstream;

/// State shared by every handler; cheap to clone
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<GatewayConfig>,
    /// Channel directory
    pub channels: Arc<dyn ChannelDirectory>,
    /// Token store
    pub tokens: Arc<dyn TokenStore>,
    /// Usage recorder
    pub recorder: UsageRecorder,
    /// Attempt planner
    pub router: ChannelRouter,
    /// Failover loop
    pub orchestrator: FailoverOrchestrator,
    /// Upstream transport
    pub upstream: Arc<HttpUpstream>,
    /// Prometheus metrics
    pub metrics: Metrics,
    /// Background stream metering
    pub metering: MeteringTasks,
    /// Process start
    pub started_at: Instant,
}

impl AppState {
    /// Start building a state
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("orchestrator", &self.orchestrator)
            .field("metering_in_flight", &self.metering.in_flight())
            .finish_non_exhaustive()
    }
}

/// Builder for [`AppState`]
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<GatewayConfig>,
    channels: Option<Arc<dyn ChannelDirectory>>,
    tokens: Option<Arc<dyn TokenStore>>,
    ledger: Option<Arc<dyn UsageLedger>>,
    router: Option<ChannelRouter>,
    upstream: Option<HttpUpstream>,
    metrics: Option<Metrics>,
}

impl AppStateBuilder {
    /// Set the configuration
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use one in-memory store for channels, tokens and the usage ledger
    #[must_use]
    pub fn store(mut self, store: Arc<MemoryStore>) -> Self {
        self.channels = Some(store.clone());
        self.tokens = Some(store.clone());
        self.ledger = Some(store);
        self
    }

    /// Set the channel directory
    #[must_use]
    pub fn channels(mut self, channels: Arc<dyn ChannelDirectory>) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Set the token store
    #[must_use]
    pub fn tokens(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Set the usage ledger
    #[must_use]
    pub fn ledger(mut self, ledger: Arc<dyn UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Set the channel router
    #[must_use]
    pub fn router(mut self, router: ChannelRouter) -> Self {
        self.router = Some(router);
        self
    }

    /// Set the upstream transport
    #[must_use]
    pub fn upstream(mut self, upstream: HttpUpstream) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Set the metrics registry
    #[must_use]
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the state. Collaborators not provided share one empty
    /// in-memory store.
    ///
    /// # Errors
    /// Returns error if metrics or the HTTP client cannot be created
    pub fn build(self) -> Result<AppState, StateError> {
        let config = self.config.unwrap_or_default();
        let fallback = Arc::new(MemoryStore::new());

        let channels = self
            .channels
            .unwrap_or_else(|| fallback.clone() as Arc<dyn ChannelDirectory>);
        let tokens = self
            .tokens
            .unwrap_or_else(|| fallback.clone() as Arc<dyn TokenStore>);
        let ledger = self.ledger.unwrap_or_else(|| fallback as Arc<dyn UsageLedger>);

        let policy = RetryPolicy::new(RetryConfig {
            rounds: config.proxy.rounds(),
            delay: config.proxy.retry_delay(),
        });

        let upstream = match self.upstream {
            Some(upstream) => upstream,
            None => HttpUpstream::new(config.proxy.connect_timeout())?,
        };

        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Metrics::new(&MetricsConfig::default())?,
        };

        Ok(AppState {
            recorder: UsageRecorder::new(ledger, tokens.clone()),
            config: Arc::new(config),
            channels,
            tokens,
            router: self.router.unwrap_or_default(),
            orchestrator: FailoverOrchestrator::new(policy),
            upstream: Arc::new(upstream),
            metrics,
            metering: MeteringTasks::new(),
            started_at: Instant::now(),
        })
    }
}

/// State construction error
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Metrics registration failed
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    /// HTTP client construction failed
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}
