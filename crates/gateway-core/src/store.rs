//! Collaborator store traits and an in-memory reference store.
//!
//! The proxy core reads channels and tokens and appends usage through these
//! traits only. [`MemoryStore`] implements all three for single-process
//! deployments and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::channel::Channel;
use crate::error::{GatewayError, GatewayResult};
use crate::token::Token;
use crate::usage::UsageRecord;

/// Read access to configured channels
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Snapshot of all active channels
    async fn list_active_channels(&self) -> GatewayResult<Vec<Channel>>;

    /// Look up a single channel by id
    async fn get_channel(&self, id: &str) -> GatewayResult<Option<Channel>>;
}

/// Token lookup and atomic usage accounting
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Resolve a caller-presented key to its token
    async fn get_token(&self, key: &str) -> GatewayResult<Option<Token>>;

    /// Atomically add `tokens` to the token's `quota_used`
    async fn increment_usage(&self, token_id: &str, tokens: u64) -> GatewayResult<()>;
}

/// Append-only usage ledger
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Append one record
    async fn append_usage_record(&self, record: UsageRecord) -> GatewayResult<()>;
}

/// Hex SHA-256 of a caller key; tokens are stored under this, never the raw key
#[must_use]
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[derive(Debug)]
struct TokenEntry {
    token: Token,
    used: AtomicU64,
}

impl TokenEntry {
    fn snapshot(&self) -> Token {
        let mut token = self.token.clone();
        token.quota_used = self.used.load(Ordering::Acquire);
        token
    }
}

/// In-memory store backing all three collaborator traits
#[derive(Debug, Default)]
pub struct MemoryStore {
    channels: RwLock<Vec<Channel>>,
    tokens_by_key: DashMap<String, Arc<TokenEntry>>,
    tokens_by_id: DashMap<String, Arc<TokenEntry>>,
    ledger: RwLock<Vec<UsageRecord>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a channel (matched by id)
    pub fn upsert_channel(&self, channel: Channel) {
        let mut channels = self.channels.write();
        if let Some(existing) = channels.iter_mut().find(|c| c.id == channel.id) {
            *existing = channel;
        } else {
            channels.push(channel);
        }
    }

    /// Register a token under the caller-presented key
    pub fn insert_token(&self, key: &str, token: Token) {
        let entry = Arc::new(TokenEntry {
            used: AtomicU64::new(token.quota_used),
            token,
        });
        self.tokens_by_id
            .insert(entry.token.id.clone(), Arc::clone(&entry));
        self.tokens_by_key.insert(hash_key(key), entry);
    }

    /// Current cumulative usage for a token id
    #[must_use]
    pub fn token_usage(&self, token_id: &str) -> Option<u64> {
        self.tokens_by_id
            .get(token_id)
            .map(|entry| entry.used.load(Ordering::Acquire))
    }

    /// Copy of every ledger record, in append order
    #[must_use]
    pub fn usage_records(&self) -> Vec<UsageRecord> {
        self.ledger.read().clone()
    }

    /// Number of configured channels, active or not
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }
}

#[async_trait]
impl ChannelDirectory for MemoryStore {
    async fn list_active_channels(&self) -> GatewayResult<Vec<Channel>> {
        Ok(self
            .channels
            .read()
            .iter()
            .filter(|c| c.is_active())
            .cloned()
            .collect())
    }

    async fn get_channel(&self, id: &str) -> GatewayResult<Option<Channel>> {
        Ok(self.channels.read().iter().find(|c| c.id == id).cloned())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_token(&self, key: &str) -> GatewayResult<Option<Token>> {
        Ok(self
            .tokens_by_key
            .get(&hash_key(key))
            .map(|entry| entry.snapshot()))
    }

    async fn increment_usage(&self, token_id: &str, tokens: u64) -> GatewayResult<()> {
        let entry = self
            .tokens_by_id
            .get(token_id)
            .ok_or_else(|| GatewayError::store(format!("unknown token {token_id}")))?;
        entry.used.fetch_add(tokens, Ordering::AcqRel);
        Ok(())
    }
}

#[async_trait]
impl UsageLedger for MemoryStore {
    async fn append_usage_record(&self, record: UsageRecord) -> GatewayResult<()> {
        self.ledger.write().push(record);
        Ok(())
    }
}
