use http::HeaderMap;

use super::{normalize_usage, parse_count, NormalizedUsage};

/// Headers that may carry a JSON-encoded usage object, in priority order
pub const USAGE_BLOB_HEADERS: &[&str] = &["x-usage", "x-openai-usage"];

const TOTAL_HEADERS: &[&str] = &["x-usage-total-tokens", "x-openai-usage-total-tokens"];
const PROMPT_HEADERS: &[&str] = &["x-usage-prompt-tokens", "x-openai-usage-prompt-tokens"];
const COMPLETION_HEADERS: &[&str] = &[
    "x-usage-completion-tokens",
    "x-openai-usage-completion-tokens",
];

/// Usage advertised in response headers.
///
/// The first present JSON blob header wins if it parses; otherwise the
/// discrete per-count headers are consulted.
#[must_use]
pub fn usage_from_headers(headers: &HeaderMap) -> Option<NormalizedUsage> {
    let blob = USAGE_BLOB_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .and_then(|text| serde_json::from_str::<serde_json::Value>(text).ok())
        .and_then(|value| normalize_usage(&value));
    if blob.is_some() {
        return blob;
    }

    NormalizedUsage::from_parts(
        pick(headers, TOTAL_HEADERS),
        pick(headers, PROMPT_HEADERS),
        pick(headers, COMPLETION_HEADERS),
    )
}

fn pick(headers: &HeaderMap, names: &[&str]) -> Option<u64> {
    names.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_count)
    })
}
