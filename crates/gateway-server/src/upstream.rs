//! reqwest-backed upstream transport.

use std::time::Duration;

use async_trait::async_trait;
use gateway_resilience::{Upstream, UpstreamCall, UpstreamError, UpstreamResponse};
use http::{HeaderMap, StatusCode};

/// Headers that describe one hop only and are never forwarded in either
/// direction. Framing headers are recomputed by the HTTP stack.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "proxy-connection",
    "te",
    "trailer",
    "upgrade",
];

/// Drop hop-by-hop headers in place
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// A response whose body has not been read yet
#[derive(Debug)]
pub struct UpstreamReply(pub reqwest::Response);

impl UpstreamResponse for UpstreamReply {
    fn status(&self) -> StatusCode {
        self.0.status()
    }
}

/// Upstream transport over a shared connection pool
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Build a client with the given connect timeout.
    ///
    /// No overall request timeout is set: streamed completions can run for
    /// minutes.
    ///
    /// # Errors
    /// Returns error if the TLS backend cannot be initialized
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    type Response = UpstreamReply;

    async fn send(&self, call: UpstreamCall) -> Result<UpstreamReply, UpstreamError> {
        let mut headers = call.headers;
        strip_hop_by_hop(&mut headers);

        let mut builder = self.client.request(call.method, &call.url).headers(headers);
        if !call.body.is_empty() {
            builder = builder.body(call.body);
        }

        builder
            .send()
            .await
            .map(UpstreamReply)
            .map_err(|e| UpstreamError::new(format!("{}: {e}", call.channel_id)))
    }
}
