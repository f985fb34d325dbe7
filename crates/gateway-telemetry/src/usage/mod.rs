//! Usage extraction.
//!
//! Providers report token usage in several shapes: a `usage` object in a JSON
//! body, response headers, or a trailing chunk of an SSE stream. Each strategy
//! normalizes into [`NormalizedUsage`] and returns `None` when no usage signal
//! is present at all, which is distinct from a reported zero.

mod headers;
mod json;
mod sse;

pub use headers::{usage_from_headers, USAGE_BLOB_HEADERS};
pub use json::{normalize_usage, usage_from_json, usage_from_slice};
pub use sse::{usage_from_sse_stream, SseUsageScanner};

pub use gateway_core::NormalizedUsage;

/// Field-name aliases for the prompt count, in priority order
pub const PROMPT_ALIASES: &[&str] = &["prompt_tokens", "promptTokens", "input_tokens", "inputTokens"];

/// Field-name aliases for the completion count, in priority order
pub const COMPLETION_ALIASES: &[&str] = &[
    "completion_tokens",
    "completionTokens",
    "output_tokens",
    "outputTokens",
];

/// Field-name aliases for the total count, in priority order
pub const TOTAL_ALIASES: &[&str] = &["total_tokens", "totalTokens", "total", "tokens", "token_count"];

/// Where a usage value came from, for the `[usage]` log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageSource {
    /// `usage` object in a JSON body
    Json,
    /// Response headers
    Header,
    /// Trailing SSE chunk
    Sse,
    /// Nothing found
    None,
}

impl UsageSource {
    /// Lowercase label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Header => "header",
            Self::Sse => "sse",
            Self::None => "none",
        }
    }
}

/// Parse a count that may arrive as a JSON number or a numeric string.
///
/// Fractions are truncated. Negative, non-finite and non-numeric values are
/// treated as absent.
pub(crate) fn parse_count(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = text.parse::<u64>() {
        return Some(value);
    }
    float_to_count(text.parse::<f64>().ok()?)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn float_to_count(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 {
        Some(value.trunc() as u64)
    } else {
        None
    }
}
