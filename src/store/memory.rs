use super::traits::{StateStore, StoreBatch, StoreCommand};
use crate::error::{CoordinatorError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};

#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// In-memory state store with real TTL semantics (for development and
/// tests). Expired entries are dropped lazily on access.
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    subscribers: Arc<RwLock<HashMap<String, Vec<mpsc::Sender<String>>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn live<'a>(entries: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
        entries.get(key).filter(|e| !e.is_expired(Instant::now()))
    }

    fn apply_command(entries: &mut HashMap<String, Entry>, command: &StoreCommand) {
        let now = Instant::now();
        match command {
            StoreCommand::Set { key, value, ttl } => {
                entries.insert(
                    key.clone(),
                    Entry {
                        value: Value::Scalar(value.clone()),
                        expires_at: ttl.map(|t| now + t),
                    },
                );
            }
            StoreCommand::Del { key } => {
                entries.remove(key);
            }
            StoreCommand::HSet { key, field, value } => {
                let entry = entries
                    .entry(key.clone())
                    .and_modify(|e| {
                        if e.is_expired(now) {
                            e.value = Value::Hash(HashMap::new());
                            e.expires_at = None;
                        }
                    })
                    .or_insert_with(|| Entry {
                        value: Value::Hash(HashMap::new()),
                        expires_at: None,
                    });
                match &mut entry.value {
                    Value::Hash(map) => {
                        map.insert(field.clone(), value.clone());
                    }
                    Value::Scalar(_) => {
                        let mut map = HashMap::new();
                        map.insert(field.clone(), value.clone());
                        entry.value = Value::Hash(map);
                    }
                }
            }
            StoreCommand::Expire { key, ttl } => {
                if let Some(entry) = entries.get_mut(key) {
                    entry.expires_at = Some(now + *ttl);
                }
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }
    let mut rest = key;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(idx) => rest = &rest[idx + part.len()..],
                None => return false,
            }
        }
    }
    true
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key).map(|e| &e.value) {
            Some(Value::Scalar(s)) => Ok(Some(s.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut entries = self.entries.write().await;
        Self::apply_command(
            &mut entries,
            &StoreCommand::Set {
                key: key.to_string(),
                value: value.to_string(),
                ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(Self::live(&entries, key).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let entries = self.entries.read().await;
        Ok(Self::live(&entries, key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now())))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        Self::apply_command(
            &mut entries,
            &StoreCommand::Expire {
                key: key.to_string(),
                ttl,
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let (current, expires_at) = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => match &entry.value {
                Value::Scalar(s) => (
                    s.parse::<i64>()
                        .map_err(|e| CoordinatorError::StoreError(e.to_string()))?,
                    entry.expires_at,
                ),
                Value::Hash(_) => {
                    return Err(CoordinatorError::StoreError(
                        "INCR on hash value".to_string(),
                    ))
                }
            },
            _ => (0, ttl.map(|t| now + t)),
        };
        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(next.to_string()),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key).map(|e| &e.value) {
            Some(Value::Hash(map)) => Ok(map.get(field).cloned()),
            _ => Ok(None),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        Self::apply_command(
            &mut entries,
            &StoreCommand::HSet {
                key: key.to_string(),
                field: field.to_string(),
                value: value.to_string(),
            },
        );
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key).map(|e| &e.value) {
            Some(Value::Hash(map)) => Ok(map.clone()),
            _ => Ok(HashMap::new()),
        }
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key) {
            if let Value::Hash(map) = &mut entry.value {
                map.remove(field);
            }
        }
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let mut subscribers = self.subscribers.write().await;
        if let Some(senders) = subscribers.get_mut(channel) {
            senders.retain(|tx| tx.try_send(payload.to_string()).is_ok());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(64);
        let mut subscribers = self.subscribers.write().await;
        subscribers.entry(channel.to_string()).or_default().push(tx);
        Ok(rx)
    }

    async fn batch(&self, batch: StoreBatch) -> Result<()> {
        // Single write lock for the whole batch keeps it atomic.
        let mut entries = self.entries.write().await;
        for command in &batch.commands {
            Self::apply_command(&mut entries, command);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn scalar_set_get_respects_ttl() -> Result<()> {
        let store = InMemoryStore::new();
        store
            .set("k", "v", Some(Duration::from_millis(30)))
            .await?;
        assert_eq!(store.get("k").await?, Some("v".to_string()));
        sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("k").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn incr_is_monotonic_and_keeps_ttl() -> Result<()> {
        let store = InMemoryStore::new();
        assert_eq!(store.incr("c", Some(Duration::from_secs(60))).await?, 1);
        assert_eq!(store.incr("c", Some(Duration::from_secs(60))).await?, 2);
        assert!(store.ttl("c").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn hash_fields_round_trip() -> Result<()> {
        let store = InMemoryStore::new();
        store.hset("h", "a", "1").await?;
        store.hset("h", "b", "2").await?;
        assert_eq!(store.hget("h", "a").await?, Some("1".to_string()));
        assert_eq!(store.hgetall("h").await?.len(), 2);
        store.hdel("h", "a").await?;
        assert_eq!(store.hget("h", "a").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn batch_applies_all_commands_atomically() -> Result<()> {
        let store = InMemoryStore::new();
        store.set("old", "x", None).await?;
        let batch = StoreBatch::new()
            .set("new", "y", Some(Duration::from_secs(10)))
            .hset("hash", "f", "z")
            .del("old");
        store.batch(batch).await?;
        assert_eq!(store.get("new").await?, Some("y".to_string()));
        assert_eq!(store.hget("hash", "f").await?, Some("z".to_string()));
        assert!(!store.exists("old").await?);
        Ok(())
    }

    #[tokio::test]
    async fn scan_matches_glob_patterns() -> Result<()> {
        let store = InMemoryStore::new();
        store.set("match:7:status", "ready", None).await?;
        store.set("match:7:host", "{}", None).await?;
        store.set("match:8:status", "ready", None).await?;
        let mut keys = store.scan_keys("match:7:*").await?;
        keys.sort();
        assert_eq!(keys, vec!["match:7:host", "match:7:status"]);
        Ok(())
    }

    #[tokio::test]
    async fn publish_reaches_subscribers() -> Result<()> {
        let store = InMemoryStore::new();
        let mut rx = store.subscribe("events").await?;
        store.publish("events", "hello").await?;
        assert_eq!(rx.recv().await, Some("hello".to_string()));
        Ok(())
    }
}
