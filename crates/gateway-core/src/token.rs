//! Caller tokens: quota and channel-access scope.

use serde::{Deserialize, Serialize};

/// Token lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Accepted by the proxy
    #[default]
    Active,
    /// Rejected with `token_disabled`
    Disabled,
}

/// A caller credential carrying quota and channel-access scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Unique identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Total quota in tokens; `None` means unlimited
    #[serde(default)]
    pub quota_total: Option<u64>,

    /// Cumulative tokens consumed; only ever increases
    #[serde(default)]
    pub quota_used: u64,

    /// Channels this token may use; `None` or empty means all
    #[serde(default)]
    pub allowed_channels: Option<Vec<String>>,

    /// Lifecycle status
    #[serde(default)]
    pub status: TokenStatus,
}

impl Token {
    /// Create an active, unlimited token allowed on every channel
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            quota_total: None,
            quota_used: 0,
            allowed_channels: None,
            status: TokenStatus::Active,
        }
    }

    /// Restrict the token to the given channels
    #[must_use]
    pub fn with_allowed_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_channels = Some(channels.into_iter().map(Into::into).collect());
        self
    }

    /// Set the quota total
    #[must_use]
    pub fn with_quota_total(mut self, quota_total: Option<u64>) -> Self {
        self.quota_total = quota_total;
        self
    }

    /// Set the lifecycle status
    #[must_use]
    pub fn with_status(mut self, status: TokenStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the token is accepted by the proxy
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TokenStatus::Active
    }

    /// Channel restriction, if any (an empty list counts as none)
    #[must_use]
    pub fn channel_scope(&self) -> Option<&[String]> {
        match self.allowed_channels.as_deref() {
            Some(list) if !list.is_empty() => Some(list),
            _ => None,
        }
    }

    /// Whether the token may use the given channel
    #[must_use]
    pub fn allows_channel(&self, channel_id: &str) -> bool {
        self.channel_scope()
            .map_or(true, |list| list.iter().any(|id| id == channel_id))
    }

    /// Whether `increment` more tokens fit within the quota
    #[must_use]
    pub fn has_quota_for(&self, increment: u64) -> bool {
        self.quota_total
            .map_or(true, |total| self.quota_used.saturating_add(increment) <= total)
    }
}
