//! Startup seed data for the in-memory store.

use std::collections::HashSet;

use gateway_core::{hash_key, parse_model_list, Channel, ChannelStatus, Token, TokenStatus};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use url::Url;

/// Channels and tokens to load at startup
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedConfig {
    /// Upstream channels
    pub channels: Vec<ChannelSeed>,
    /// Caller tokens
    pub tokens: Vec<TokenSeed>,
}

/// A channel as written in the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSeed {
    /// Unique id
    pub id: String,
    /// Display name, defaults to the id
    #[serde(default)]
    pub name: Option<String>,
    /// Upstream base URL
    pub base_url: String,
    /// Upstream credential
    pub api_key: SecretString,
    /// Selection weight; anything below 1 becomes 1
    #[serde(default)]
    pub weight: Option<i64>,
    /// Lifecycle status
    #[serde(default)]
    pub status: ChannelStatus,
    /// Advisory requests per minute
    #[serde(default)]
    pub rate_limit: Option<u32>,
    /// Model list: an array, a comma-separated string, or a `/v1/models` payload
    #[serde(default)]
    pub models: Option<Value>,
}

/// A token as written in the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSeed {
    /// Key presented by callers
    pub key: SecretString,
    /// Token id, derived from the key hash when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Quota total; absent means unlimited
    #[serde(default)]
    pub quota_total: Option<u64>,
    /// Channels this token may use
    #[serde(default)]
    pub allowed_channels: Option<Vec<String>>,
    /// Lifecycle status
    #[serde(default)]
    pub status: TokenStatus,
}

impl ChannelSeed {
    /// Build the channel record
    #[must_use]
    pub fn to_channel(&self) -> Channel {
        let weight = self
            .weight
            .map_or(1, |w| u32::try_from(w.max(1)).unwrap_or(u32::MAX));
        let models = self
            .models
            .as_ref()
            .map(parse_model_list)
            .unwrap_or_default();

        let mut channel = Channel::new(
            self.id.clone(),
            self.base_url.clone(),
            self.api_key.expose_secret().clone(),
        )
        .with_weight(weight)
        .with_status(self.status)
        .with_models(models);
        if let Some(name) = &self.name {
            channel = channel.with_name(name.clone());
        }
        channel.rate_limit = self.rate_limit;
        channel
    }
}

impl TokenSeed {
    /// Token id, explicit or derived from the key
    #[must_use]
    pub fn token_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| {
            let digest = hash_key(self.key.expose_secret());
            format!("tok_{}", &digest[..12])
        })
    }

    /// Build the token record
    #[must_use]
    pub fn to_token(&self) -> Token {
        let mut token = Token::new(self.token_id())
            .with_quota_total(self.quota_total)
            .with_status(self.status);
        if let Some(channels) = &self.allowed_channels {
            token = token.with_allowed_channels(channels.iter().cloned());
        }
        if let Some(name) = &self.name {
            token.name = name.clone();
        }
        token
    }

    /// Caller-presented key
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.expose_secret()
    }
}

impl SeedConfig {
    /// Check ids, URLs and keys; returns every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut channel_ids = HashSet::new();
        for channel in &self.channels {
            if channel.id.trim().is_empty() {
                problems.push("channel id must not be empty".to_string());
            } else if !channel_ids.insert(channel.id.as_str()) {
                problems.push(format!("duplicate channel id '{}'", channel.id));
            }
            match Url::parse(channel.base_url.trim()) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => problems.push(format!(
                    "channel '{}' base_url has unsupported scheme '{}'",
                    channel.id,
                    url.scheme()
                )),
                Err(e) => problems.push(format!(
                    "channel '{}' base_url is invalid: {e}",
                    channel.id
                )),
            }
        }

        let mut keys = HashSet::new();
        let mut token_ids = HashSet::new();
        for token in &self.tokens {
            let id = token.token_id();
            if token.key().trim().is_empty() {
                problems.push(format!("token '{id}' has an empty key"));
            } else if !keys.insert(token.key()) {
                problems.push(format!("token '{id}' reuses another token's key"));
            }
            if !token_ids.insert(id.clone()) {
                problems.push(format!("duplicate token id '{id}'"));
            }
            for channel in token.allowed_channels.iter().flatten() {
                if !channel_ids.contains(channel.as_str()) {
                    warn!(token_id = %id, channel_id = %channel, "Token allows unknown channel");
                }
            }
        }

        problems
    }
}
