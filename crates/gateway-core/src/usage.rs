//! Token usage values and the append-only usage ledger record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical token counts for one model invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUsage {
    /// Total tokens billed
    pub total_tokens: u64,
    /// Prompt (input) tokens
    pub prompt_tokens: u64,
    /// Completion (output) tokens
    pub completion_tokens: u64,
}

impl NormalizedUsage {
    /// Create a usage value from explicit counts
    #[must_use]
    pub fn new(total_tokens: u64, prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            total_tokens,
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Build from partially known counts.
    ///
    /// Returns `None` when no count at all is known. A missing prompt or
    /// completion count becomes 0; a missing total is `prompt + completion`.
    #[must_use]
    pub fn from_parts(
        total: Option<u64>,
        prompt: Option<u64>,
        completion: Option<u64>,
    ) -> Option<Self> {
        if total.is_none() && prompt.is_none() && completion.is_none() {
            return None;
        }
        let prompt_tokens = prompt.unwrap_or(0);
        let completion_tokens = completion.unwrap_or(0);
        Some(Self {
            total_tokens: total.unwrap_or_else(|| prompt_tokens.saturating_add(completion_tokens)),
            prompt_tokens,
            completion_tokens,
        })
    }
}

/// Outcome recorded for a proxied request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    /// Final response was 2xx
    Ok,
    /// Anything else, including network failure
    Error,
}

impl UsageStatus {
    /// Status for a final upstream HTTP status code
    #[must_use]
    pub fn from_http_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            Self::Ok
        } else {
            Self::Error
        }
    }

    /// Lowercase label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Immutable usage fact, appended once per completed proxy attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Record identifier
    pub id: Uuid,
    /// Caller token
    pub token_id: Option<String>,
    /// Channel that produced the final response, if any was reached
    pub channel_id: Option<String>,
    /// Requested model
    pub model: Option<String>,
    /// Inbound request path
    pub request_path: String,
    /// Total tokens
    pub total_tokens: u64,
    /// Prompt tokens
    pub prompt_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
    /// Time from dispatch to final upstream response headers
    pub latency_ms: u64,
    /// Outcome
    pub status: UsageStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
