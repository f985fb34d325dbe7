use serde_json::{Map, Value};

use super::{float_to_count, parse_count, NormalizedUsage};
use super::{COMPLETION_ALIASES, PROMPT_ALIASES, TOTAL_ALIASES};

/// Usage from a response payload: top-level `usage`, else `data.usage`
#[must_use]
pub fn usage_from_json(payload: &Value) -> Option<NormalizedUsage> {
    let object = payload.as_object()?;
    let usage = match object.get("usage") {
        Some(usage) if !usage.is_null() => usage,
        _ => object.get("data")?.as_object()?.get("usage")?,
    };
    normalize_usage(usage)
}

/// Parse raw bytes as JSON and extract usage; invalid JSON yields `None`
#[must_use]
pub fn usage_from_slice(payload: &[u8]) -> Option<NormalizedUsage> {
    let value: Value = serde_json::from_slice(payload).ok()?;
    usage_from_json(&value)
}

/// Normalize a usage object using the alias tables
#[must_use]
pub fn normalize_usage(usage: &Value) -> Option<NormalizedUsage> {
    let object = usage.as_object()?;
    NormalizedUsage::from_parts(
        pick(object, TOTAL_ALIASES),
        pick(object, PROMPT_ALIASES),
        pick(object, COMPLETION_ALIASES),
    )
}

fn pick(object: &Map<String, Value>, aliases: &[&str]) -> Option<u64> {
    aliases
        .iter()
        .find_map(|alias| object.get(*alias).and_then(count))
}

fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_to_count)),
        Value::String(s) => parse_count(s),
        _ => None,
    }
}
