//! Upstream channel records.
//!
//! A channel is one configured upstream provider endpoint: base URL, credential,
//! selection weight and the models it serves. The gateway only ever reads a
//! per-request snapshot of channels; it never mutates them.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Eligible for selection
    #[default]
    Active,
    /// Never selected
    Disabled,
}

/// An upstream provider credential and policy record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Unique, stable identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Upstream base URL as configured (normalized when targets are built)
    pub base_url: String,

    /// Upstream credential
    #[serde(skip_serializing)]
    pub api_key: SecretString,

    /// Selection weight; coerced to at least 1 before use
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// Lifecycle status
    #[serde(default)]
    pub status: ChannelStatus,

    /// Advisory request-per-minute limit, not enforced by the gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,

    /// Ordered set of model identifiers served by this channel
    #[serde(default)]
    pub supported_models: Vec<String>,
}

fn default_weight() -> u32 {
    1
}

impl Channel {
    /// Create an active channel with weight 1 and no model metadata
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            base_url: base_url.into(),
            api_key: SecretString::new(api_key.into()),
            weight: 1,
            status: ChannelStatus::Active,
            rate_limit: None,
            supported_models: Vec::new(),
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the selection weight
    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the lifecycle status
    #[must_use]
    pub fn with_status(mut self, status: ChannelStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the supported models, dropping empties and duplicates
    #[must_use]
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_models = dedup_ordered(models.into_iter().map(Into::into));
        self
    }

    /// Weight used for selection, never below 1
    #[must_use]
    pub fn effective_weight(&self) -> u32 {
        self.weight.max(1)
    }

    /// Whether the channel may be selected at all
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ChannelStatus::Active
    }

    /// Whether the channel advertises the given model
    #[must_use]
    pub fn supports_model(&self, model: &str) -> bool {
        self.supported_models.iter().any(|m| m == model)
    }

    /// Base URL without trailing slashes or `/v1`
    #[must_use]
    pub fn normalized_base_url(&self) -> String {
        normalize_base_url(&self.base_url)
    }

    /// Raw credential for the outbound request
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Strip trailing slashes and a single trailing `/v1` (case-insensitive)
#[must_use]
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    let len = trimmed.len();
    if len >= 3 && trimmed.is_char_boundary(len - 3) && trimmed[len - 3..].eq_ignore_ascii_case("/v1")
    {
        return trimmed[..len - 3].to_string();
    }
    trimmed.to_string()
}

/// Derive an ordered model list from provider-reported or hand-written metadata.
///
/// Accepts `["a", "b"]`, `[{"id": "a"}]`, `{"data": [...]}` (the `/v1/models`
/// shape) or `"a, b"`.
#[must_use]
pub fn parse_model_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(entries) => entries.iter().filter_map(model_id).collect(),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(entries)) => entries.iter().filter_map(model_id).collect(),
            _ => Vec::new(),
        },
        Value::String(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    dedup_ordered(items)
}

fn model_id(entry: &Value) -> Option<String> {
    match entry {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        Value::Object(map) => match map.get("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn dedup_ordered(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim().to_string();
        if item.is_empty() || out.contains(&item) {
            continue;
        }
        out.push(item);
    }
    out
}
