//! The proxy handler mounted under `/v1`.
//!
//! Flow per request: plan the channel order, run failover, relay the final
//! response, meter usage. Non-streaming responses are metered before the
//! handler returns. Streaming responses are pumped by a tracked background
//! task that owns the upstream body: it forwards each chunk to the caller and
//! scans it for the trailing usage event. The task keeps draining after the
//! caller goes away, so usage is committed once the upstream stream ends.

use std::io;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::Response,
};
use futures::{stream, StreamExt};
use gateway_core::{GatewayError, NormalizedUsage, ProxyRequest, UsageStatus};
use gateway_resilience::{FailoverOutcome, UpstreamResponse};
use gateway_telemetry::{
    usage_from_headers, usage_from_slice, usage_from_sse_stream, Metrics, PendingUsage,
    UsageRecorder, UsageSource,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    auth::AuthenticatedToken,
    error::ApiError,
    extractors::RequestId,
    state::AppState,
    upstream::{strip_hop_by_hop, UpstreamReply},
};

/// Forward any method and path under the proxy mount.
///
/// The upstream path is the full inbound path, mount prefix included.
pub async fn proxy_handler(
    State(state): State<AppState>,
    AuthenticatedToken(token): AuthenticatedToken,
    RequestId(request_id): RequestId,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = ProxyRequest::new(
        method,
        uri.path(),
        uri.query().map(str::to_string),
        headers,
        body,
    );

    if !token.has_quota_for(1) {
        warn!(
            request_id = %request_id,
            token_id = %token.id,
            quota_used = token.quota_used,
            quota_total = token.quota_total,
            "Token is over quota; forwarding anyway"
        );
    }

    let snapshot = state.channels.list_active_channels().await?;
    let plan = match state
        .router
        .plan(&snapshot, Some(&token), request.model.as_deref())
    {
        Ok(plan) => plan,
        Err(e) => {
            state.metrics.record_failover(e.code(), 0);
            return Err(e.into());
        }
    };

    debug!(
        request_id = %request_id,
        path = %request.path,
        model = request.model.as_deref().unwrap_or(""),
        stream = request.stream,
        candidates = plan.len(),
        "Dispatching proxy request"
    );

    let started = Instant::now();
    let outcome = state
        .orchestrator
        .execute(state.upstream.as_ref(), &request, &plan)
        .await;
    let latency = started.elapsed();

    state
        .metrics
        .record_failover(outcome.label(), outcome.attempts());
    state.metrics.observe_latency(latency);

    let pending = PendingUsage::new(request.path.clone(), UsageStatus::Error)
        .with_token(Some(token.id.clone()))
        .with_model(request.model.clone())
        .with_latency(latency);

    let (reply, channel, attempts) = match outcome {
        FailoverOutcome::Success {
            response,
            channel,
            attempts,
        }
        | FailoverOutcome::Failed {
            response,
            channel,
            attempts,
        } => (response, channel, attempts),
        FailoverOutcome::Unavailable { attempts } => {
            warn!(
                request_id = %request_id,
                attempts,
                "Every upstream attempt failed"
            );
            let commit = UsageCommit {
                recorder: state.recorder.clone(),
                metrics: state.metrics.clone(),
                pending,
                stream: request.stream,
                status: StatusCode::BAD_GATEWAY.as_u16(),
            };
            commit.commit("immediate", None, UsageSource::None).await;
            state
                .metrics
                .record_response(StatusCode::BAD_GATEWAY.as_u16());
            return Err(GatewayError::UpstreamUnavailable { attempts }.into());
        }
    };

    let status = reply.status();
    state.metrics.record_response(status.as_u16());
    info!(
        request_id = %request_id,
        channel = %channel.id,
        status = status.as_u16(),
        attempts,
        latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        "Upstream response accepted"
    );

    let commit = UsageCommit {
        recorder: state.recorder.clone(),
        metrics: state.metrics.clone(),
        pending: PendingUsage {
            status: UsageStatus::from_http_status(status.as_u16()),
            ..pending
        }
        .with_channel(Some(channel.id.clone())),
        stream: request.stream,
        status: status.as_u16(),
    };

    if request.stream {
        Ok(relay_stream(&state, reply, commit))
    } else {
        relay_buffered(reply, commit).await
    }
}

/// Read the whole body, meter it, then relay it
async fn relay_buffered(reply: UpstreamReply, commit: UsageCommit) -> Result<Response, ApiError> {
    let UpstreamReply(response) = reply;
    let status = response.status();
    let mut headers = response.headers().clone();
    strip_hop_by_hop(&mut headers);

    let header_usage = usage_from_headers(&headers);
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(mime::APPLICATION_JSON.essence_str()));

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            warn!(status = status.as_u16(), error = %e, "Failed to read upstream body");
            let source = if header_usage.is_some() {
                UsageSource::Header
            } else {
                UsageSource::None
            };
            commit.commit("immediate", header_usage, source).await;
            return Err(ApiError::new(
                StatusCode::BAD_GATEWAY,
                "upstream_unavailable",
                "upstream body could not be read",
            ));
        }
    };

    let json_usage = if status.is_success() && is_json {
        usage_from_slice(&body)
    } else {
        None
    };

    let (usage, source) = match (json_usage, header_usage) {
        (Some(usage), _) => (Some(usage), UsageSource::Json),
        (None, Some(usage)) => (Some(usage), UsageSource::Header),
        (None, None) => (None, UsageSource::None),
    };
    commit.commit("immediate", usage, source).await;

    let mut relayed = Response::new(Body::from(body));
    *relayed.status_mut() = status;
    *relayed.headers_mut() = headers;
    Ok(relayed)
}

/// Relay chunks as they arrive; the metering task owns the upstream body
fn relay_stream(state: &AppState, reply: UpstreamReply, commit: UsageCommit) -> Response {
    let UpstreamReply(response) = reply;
    let status = response.status();
    let mut headers = response.headers().clone();
    strip_hop_by_hop(&mut headers);

    if let Some(usage) = usage_from_headers(&headers) {
        debug!(
            total_tokens = usage.total_tokens,
            "Usage headers on streamed response; billing waits for the stream"
        );
    }

    let (tx, rx) = mpsc::unbounded_channel::<Result<Bytes, io::Error>>();
    let upstream = response.bytes_stream().inspect(move |item| {
        let forwarded = match item {
            Ok(chunk) => Ok(chunk.clone()),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
        };
        // A closed receiver means the caller left; scanning continues
        let _ = tx.send(forwarded);
    });

    let metrics = state.metrics.clone();
    metrics.metering_started();
    state.metering.spawn(async move {
        let usage = usage_from_sse_stream(upstream).await;
        let source = if usage.is_some() {
            UsageSource::Sse
        } else {
            UsageSource::None
        };
        commit.commit("stream", usage, source).await;
        metrics.metering_finished();
    });

    let relayed = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });

    let mut relayed_response = Response::new(Body::from_stream(relayed));
    *relayed_response.status_mut() = status;
    *relayed_response.headers_mut() = headers;
    relayed_response
}

/// Everything needed to write the usage record once usage is known
struct UsageCommit {
    recorder: UsageRecorder,
    metrics: Metrics,
    pending: PendingUsage,
    stream: bool,
    status: u16,
}

impl UsageCommit {
    /// Log and record; failures are logged and counted, never propagated
    async fn commit(
        self,
        label: &'static str,
        usage: Option<NormalizedUsage>,
        source: UsageSource,
    ) {
        let counts = usage.unwrap_or_default();
        info!(
            source = source.as_str(),
            total_tokens = counts.total_tokens,
            prompt_tokens = counts.prompt_tokens,
            completion_tokens = counts.completion_tokens,
            stream = self.stream,
            status = self.status,
            model = self.pending.model.as_deref().unwrap_or(""),
            path = %self.pending.request_path,
            "[usage] {label}"
        );

        match self.recorder.record(self.pending, usage).await {
            Ok(record) => {
                self.metrics.record_usage(&counts);
                debug!(record_id = %record.id, "Usage committed");
            }
            Err(e) => {
                self.metrics.record_metering_failure();
                warn!(error = %e, label, "Failed to record usage");
            }
        }
    }
}
