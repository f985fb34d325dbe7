//! Usage recording.
//!
//! Appends exactly one ledger record per completed proxy request and charges
//! the caller token for the billed tokens.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gateway_core::{
    GatewayResult, NormalizedUsage, TokenStore, UsageLedger, UsageRecord, UsageStatus,
};
use tracing::debug;
use uuid::Uuid;

/// Request context captured before usage is known.
///
/// Consumed by [`UsageRecorder::record`], so a request can be recorded at
/// most once.
#[derive(Debug, Clone)]
pub struct PendingUsage {
    /// Caller token
    pub token_id: Option<String>,
    /// Channel that produced the final response
    pub channel_id: Option<String>,
    /// Requested model
    pub model: Option<String>,
    /// Inbound request path
    pub request_path: String,
    /// Dispatch to final response headers
    pub latency: Duration,
    /// Outcome
    pub status: UsageStatus,
}

impl PendingUsage {
    /// Start a pending record for a request path
    pub fn new(request_path: impl Into<String>, status: UsageStatus) -> Self {
        Self {
            token_id: None,
            channel_id: None,
            model: None,
            request_path: request_path.into(),
            latency: Duration::ZERO,
            status,
        }
    }

    /// Set the caller token
    #[must_use]
    pub fn with_token(mut self, token_id: Option<String>) -> Self {
        self.token_id = token_id;
        self
    }

    /// Set the channel
    #[must_use]
    pub fn with_channel(mut self, channel_id: Option<String>) -> Self {
        self.channel_id = channel_id;
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Set the latency
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Writes usage records and quota increments
#[derive(Clone)]
pub struct UsageRecorder {
    ledger: Arc<dyn UsageLedger>,
    tokens: Arc<dyn TokenStore>,
}

impl UsageRecorder {
    /// Create a recorder over the given collaborators
    #[must_use]
    pub fn new(ledger: Arc<dyn UsageLedger>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { ledger, tokens }
    }

    /// Record one request outcome.
    ///
    /// Missing usage is recorded as zeros. The token's quota counter is only
    /// incremented when a token is known and the total is positive. The quota
    /// increment is attempted even if the ledger append fails.
    ///
    /// # Errors
    ///
    /// Returns the first collaborator failure.
    pub async fn record(
        &self,
        pending: PendingUsage,
        usage: Option<NormalizedUsage>,
    ) -> GatewayResult<UsageRecord> {
        let usage = usage.unwrap_or_default();
        let record = UsageRecord {
            id: Uuid::new_v4(),
            token_id: pending.token_id,
            channel_id: pending.channel_id,
            model: pending.model,
            request_path: pending.request_path,
            total_tokens: usage.total_tokens,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            latency_ms: u64::try_from(pending.latency.as_millis()).unwrap_or(u64::MAX),
            status: pending.status,
            created_at: Utc::now(),
        };

        let appended = self.ledger.append_usage_record(record.clone()).await;

        let charged = match record.token_id.as_deref() {
            Some(token_id) if record.total_tokens > 0 => {
                self.tokens
                    .increment_usage(token_id, record.total_tokens)
                    .await
            }
            _ => Ok(()),
        };

        appended?;
        charged?;

        debug!(
            record_id = %record.id,
            token_id = record.token_id.as_deref().unwrap_or(""),
            channel_id = record.channel_id.as_deref().unwrap_or(""),
            total_tokens = record.total_tokens,
            status = record.status.as_str(),
            "Usage recorded"
        );
        Ok(record)
    }
}

impl fmt::Debug for UsageRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageRecorder").finish_non_exhaustive()
    }
}
