//! Prometheus metrics for the relay gateway.

use std::fmt;
use std::time::Duration;

use gateway_core::NormalizedUsage;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Prefix for every metric name
    pub namespace: String,
    /// Latency histogram buckets, in seconds
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "relay_gateway".to_string(),
            latency_buckets: vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        }
    }
}

/// Gateway metrics, cheap to clone
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    upstream_attempts_total: IntCounter,
    responses_total: IntCounterVec,
    tokens_total: IntCounterVec,
    metering_failures_total: IntCounter,
    metering_in_flight: IntGauge,
    request_duration: Histogram,
}

impl Metrics {
    /// Create and register all metrics in a fresh registry
    ///
    /// # Errors
    /// Returns error if a metric cannot be created or registered
    pub fn new(config: &MetricsConfig) -> Result<Self, MetricsError> {
        let registry = Registry::new();
        let ns = config.namespace.as_str();

        let requests_total = IntCounterVec::new(
            Opts::new("proxy_requests_total", "Proxied requests by failover outcome").namespace(ns),
            &["outcome"],
        )?;
        let upstream_attempts_total = IntCounter::with_opts(
            Opts::new("upstream_attempts_total", "Upstream calls issued").namespace(ns),
        )?;
        let responses_total = IntCounterVec::new(
            Opts::new("responses_total", "Responses relayed by status class").namespace(ns),
            &["class"],
        )?;
        let tokens_total = IntCounterVec::new(
            Opts::new("tokens_total", "Metered tokens by kind").namespace(ns),
            &["kind"],
        )?;
        let metering_failures_total = IntCounter::with_opts(
            Opts::new("metering_failures_total", "Usage records that could not be written")
                .namespace(ns),
        )?;
        let metering_in_flight = IntGauge::with_opts(
            Opts::new("metering_in_flight", "Background stream metering tasks running")
                .namespace(ns),
        )?;
        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "upstream_latency_seconds",
                "Dispatch to final upstream response headers",
            )
            .namespace(ns)
            .buckets(config.latency_buckets.clone()),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(upstream_attempts_total.clone()))?;
        registry.register(Box::new(responses_total.clone()))?;
        registry.register(Box::new(tokens_total.clone()))?;
        registry.register(Box::new(metering_failures_total.clone()))?;
        registry.register(Box::new(metering_in_flight.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            upstream_attempts_total,
            responses_total,
            tokens_total,
            metering_failures_total,
            metering_in_flight,
            request_duration,
        })
    }

    /// Count one proxied request and the upstream calls it took
    pub fn record_failover(&self, outcome: &str, attempts: u32) {
        self.requests_total.with_label_values(&[outcome]).inc();
        self.upstream_attempts_total.inc_by(u64::from(attempts));
    }

    /// Count a relayed response by status class (`2xx`, `4xx`, ...)
    pub fn record_response(&self, status: u16) {
        let class = match status {
            100..=199 => "1xx",
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };
        self.responses_total.with_label_values(&[class]).inc();
    }

    /// Add metered tokens
    pub fn record_usage(&self, usage: &NormalizedUsage) {
        self.tokens_total
            .with_label_values(&["prompt"])
            .inc_by(usage.prompt_tokens);
        self.tokens_total
            .with_label_values(&["completion"])
            .inc_by(usage.completion_tokens);
        self.tokens_total
            .with_label_values(&["total"])
            .inc_by(usage.total_tokens);
    }

    /// Count a swallowed metering failure
    pub fn record_metering_failure(&self) {
        self.metering_failures_total.inc();
    }

    /// A background metering task started
    pub fn metering_started(&self) {
        self.metering_in_flight.inc();
    }

    /// A background metering task finished
    pub fn metering_finished(&self) {
        self.metering_in_flight.dec();
    }

    /// Observe upstream latency
    pub fn observe_latency(&self, latency: Duration) {
        self.request_duration.observe(latency.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn gather(&self) -> Result<String, MetricsError> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    /// Content type of [`Metrics::gather`] output
    #[must_use]
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

/// Metrics error
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Prometheus rejected a metric
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    /// Output was not valid UTF-8
    #[error("metrics encoding error: {0}")]
    Encoding(String),
}
