//! Multi-channel failover.
//!
//! Channels are tried one at a time in the planned order. The first 2xx
//! response ends the loop. A full pass with at least one retryable outcome
//! (network error, 408, 429 or 5xx) earns another pass, up to the configured
//! number of rounds. Non-retryable responses do not stop the current pass.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use gateway_core::{Channel, ProxyRequest};
use http::{HeaderMap, Method, StatusCode};
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;

/// One outbound call to one channel
#[derive(Debug, Clone)]
pub struct UpstreamCall {
    /// Target channel id
    pub channel_id: String,
    /// HTTP method
    pub method: Method,
    /// Absolute target URL
    pub url: String,
    /// Outbound headers carrying the channel credential
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl UpstreamCall {
    /// Build the call for `channel`.
    ///
    /// # Errors
    ///
    /// Fails when the channel credential cannot be carried in a header.
    pub fn prepare(request: &ProxyRequest, channel: &Channel) -> Result<Self, UpstreamError> {
        let headers = request
            .headers_for(channel)
            .map_err(|e| UpstreamError::new(e.to_string()))?;
        Ok(Self {
            channel_id: channel.id.clone(),
            method: request.method.clone(),
            url: request.target_url(channel),
            headers,
            body: request.body.clone(),
        })
    }
}

/// Failure to obtain any response from a channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct UpstreamError {
    /// Human-readable cause
    pub message: String,
}

impl UpstreamError {
    /// Create a new upstream error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A received upstream response
pub trait UpstreamResponse: Send {
    /// HTTP status of the response
    fn status(&self) -> StatusCode;
}

/// Transport used to reach channels
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Response type; its body is left unread
    type Response: UpstreamResponse;

    /// Issue one call
    async fn send(&self, call: UpstreamCall) -> Result<Self::Response, UpstreamError>;
}

/// How a failover run ended
pub enum FailoverOutcome<R> {
    /// A channel answered 2xx
    Success {
        /// The response to relay
        response: R,
        /// Channel that answered
        channel: Channel,
        /// Attempts made, including this one
        attempts: u32,
    },
    /// Every attempt ended without a 2xx, but at least one response was
    /// received; the last one is relayed as-is
    Failed {
        /// Last response received
        response: R,
        /// Channel that produced it
        channel: Channel,
        /// Attempts made
        attempts: u32,
    },
    /// No response was received at all
    Unavailable {
        /// Attempts made
        attempts: u32,
    },
}

impl<R> FailoverOutcome<R> {
    /// Attempts made across all rounds
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::Unavailable { attempts } => *attempts,
        }
    }

    /// Outcome label for logs and metrics
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failed",
            Self::Unavailable { .. } => "unavailable",
        }
    }
}

impl<R> fmt::Debug for FailoverOutcome<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success {
                channel, attempts, ..
            } => f
                .debug_struct("Success")
                .field("channel", &channel.id)
                .field("attempts", attempts)
                .finish_non_exhaustive(),
            Self::Failed {
                channel, attempts, ..
            } => f
                .debug_struct("Failed")
                .field("channel", &channel.id)
                .field("attempts", attempts)
                .finish_non_exhaustive(),
            Self::Unavailable { attempts } => f
                .debug_struct("Unavailable")
                .field("attempts", attempts)
                .finish(),
        }
    }
}

/// Drives the round/channel attempt loop
#[derive(Debug, Clone)]
pub struct FailoverOrchestrator {
    policy: RetryPolicy,
}

impl FailoverOrchestrator {
    /// Create an orchestrator with the given policy
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The retry policy in use
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Try `channels` in order until one answers 2xx or the rounds run out
    pub async fn execute<U>(
        &self,
        upstream: &U,
        request: &ProxyRequest,
        channels: &[Channel],
    ) -> FailoverOutcome<U::Response>
    where
        U: Upstream + ?Sized,
    {
        let mut attempts = 0u32;
        let mut last: Option<(U::Response, &Channel)> = None;

        for round in 0..self.policy.rounds() {
            let mut saw_retryable = false;

            for channel in channels {
                attempts += 1;

                let sent = match UpstreamCall::prepare(request, channel) {
                    Ok(call) => upstream.send(call).await,
                    Err(e) => Err(e),
                };

                match sent {
                    Err(error) => {
                        saw_retryable = true;
                        warn!(
                            channel_id = %channel.id,
                            round = round + 1,
                            attempt = attempts,
                            error = %error,
                            "Upstream attempt failed"
                        );
                    }
                    Ok(response) if response.status().is_success() => {
                        if attempts > 1 {
                            info!(
                                channel_id = %channel.id,
                                attempts = attempts,
                                "Upstream succeeded after failover"
                            );
                        }
                        return FailoverOutcome::Success {
                            response,
                            channel: channel.clone(),
                            attempts,
                        };
                    }
                    Ok(response) => {
                        let status = response.status();
                        if RetryPolicy::is_retryable_status(status) {
                            saw_retryable = true;
                        }
                        warn!(
                            channel_id = %channel.id,
                            round = round + 1,
                            attempt = attempts,
                            status = status.as_u16(),
                            "Upstream returned non-success status"
                        );
                        last = Some((response, channel));
                    }
                }
            }

            if !saw_retryable || !self.policy.has_round_after(round) {
                break;
            }

            debug!(
                next_round = round + 2,
                delay_ms = self.policy.delay().as_millis(),
                "Starting another failover round"
            );
            tokio::time::sleep(self.policy.delay()).await;
        }

        match last {
            Some((response, channel)) => FailoverOutcome::Failed {
                response,
                channel: channel.clone(),
                attempts,
            },
            None => FailoverOutcome::Unavailable { attempts },
        }
    }
}
