use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// A single command inside an atomic batch.
#[derive(Debug, Clone)]
pub enum StoreCommand {
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    Del {
        key: String,
    },
    HSet {
        key: String,
        field: String,
        value: String,
    },
    Expire {
        key: String,
        ttl: Duration,
    },
}

/// An ordered multi-command batch. Stage handoffs go through batches so a
/// partial failure never leaves a match half-transferred.
#[derive(Debug, Clone, Default)]
pub struct StoreBatch {
    pub commands: Vec<StoreCommand>,
}

impl StoreBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) -> Self {
        self.commands.push(StoreCommand::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        });
        self
    }

    pub fn del(mut self, key: impl Into<String>) -> Self {
        self.commands.push(StoreCommand::Del { key: key.into() });
        self
    }

    pub fn hset(
        mut self,
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.commands.push(StoreCommand::HSet {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn expire(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.commands.push(StoreCommand::Expire {
            key: key.into(),
            ttl,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Narrow facade over an expiring key-value store. All cross-component
/// coordination state lives behind this trait; the pipeline never sees the
/// backend's own command surface.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
    async fn del(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remaining time to live, if the key exists and carries a TTL.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Atomic increment; `ttl` is applied only when the counter is created.
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;
    async fn hdel(&self, key: &str, field: &str) -> Result<()>;

    /// Keys matching a glob-style pattern (`match:42:*`).
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;

    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>>;

    /// Execute a batch atomically: either all commands apply or none do.
    async fn batch(&self, batch: StoreBatch) -> Result<()>;
}
