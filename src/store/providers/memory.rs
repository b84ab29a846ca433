//! In-process key-value store
//!
//! Emulates the Redis command subset used by the cache (strings with TTL,
//! sets, `KEYS` globbing, `TTL`, `INFO`). Expiry is lazy: a key past its
//! deadline is dropped the next time anything looks at it.
//!
//! **Important**: state is local to the process. Use the Redis store when
//! several application instances must share one cache.

use crate::store::errors::StoreResult;
use crate::store::glob::glob_match;
use crate::store::traits::{KeyValueStore, TTL_MISSING, TTL_NO_EXPIRY};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
enum StoredValue {
    Text(String),
    Set(HashSet<String>),
}

impl StoredValue {
    fn approximate_size(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Set(members) => members.iter().map(String::len).sum(),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory store with per-key deadlines
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys (strings and sets)
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        slots.retain(|_, slot| !slot.is_expired(now));
        slots.len()
    }

    /// Whether the store holds no live keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_slot<'a>(
        slots: &'a mut HashMap<String, Slot>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Slot> {
        if slots.get(key).is_some_and(|slot| slot.is_expired(now)) {
            slots.remove(key);
            return None;
        }
        slots.get_mut(key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        let value = match Self::live_slot(&mut slots, key, now) {
            Some(Slot {
                value: StoredValue::Text(text),
                ..
            }) => Some(text.clone()),
            _ => None,
        };
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        let deadline = Instant::now() + Duration::from_secs(ttl_seconds.max(1));
        self.slots.lock().insert(
            key.to_string(),
            Slot {
                value: StoredValue::Text(value.to_string()),
                expires_at: Some(deadline),
            },
        );
        debug!(key = key, ttl_seconds = ttl_seconds, "Memory store SET");
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        let removed = keys
            .iter()
            .filter(|key| matches!(slots.remove(key.as_str()), Some(slot) if !slot.is_expired(now)))
            .count();
        Ok(removed as u64)
    }

    async fn sadd(&self, set_key: &str, members: &[String]) -> StoreResult<u64> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        if Self::live_slot(&mut slots, set_key, now).is_none() {
            slots.insert(
                set_key.to_string(),
                Slot {
                    value: StoredValue::Set(HashSet::new()),
                    expires_at: None,
                },
            );
        }

        match slots.get_mut(set_key) {
            Some(Slot {
                value: StoredValue::Set(existing),
                ..
            }) => {
                let added = members
                    .iter()
                    .filter(|member| existing.insert((*member).clone()))
                    .count();
                Ok(added as u64)
            }
            _ => Err(crate::store::StoreError::Command(format!(
                "WRONGTYPE key '{set_key}' does not hold a set"
            ))),
        }
    }

    async fn smembers(&self, set_key: &str) -> StoreResult<Vec<String>> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        let members = match Self::live_slot(&mut slots, set_key, now) {
            Some(Slot {
                value: StoredValue::Set(members),
                ..
            }) => members.iter().cloned().collect(),
            _ => Vec::new(),
        };
        Ok(members)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        match Self::live_slot(&mut slots, key, now) {
            Some(slot) => {
                slot.expires_at = Some(now + Duration::from_secs(ttl_seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        slots.retain(|_, slot| !slot.is_expired(now));
        let mut matched: Vec<String> = slots
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        matched.sort();
        Ok(matched)
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        let remaining = match Self::live_slot(&mut slots, key, now) {
            None => TTL_MISSING,
            Some(Slot {
                expires_at: None, ..
            }) => TTL_NO_EXPIRY,
            Some(Slot {
                expires_at: Some(deadline),
                ..
            }) => deadline.saturating_duration_since(now).as_secs() as i64,
        };
        Ok(remaining)
    }

    async fn ping(&self) -> StoreResult<String> {
        Ok("PONG".to_string())
    }

    async fn info(&self, section: Option<&str>) -> StoreResult<String> {
        let now = Instant::now();
        let slots = self.slots.lock();
        let live: Vec<&Slot> = slots.values().filter(|s| !s.is_expired(now)).collect();
        let used_memory: usize = slots
            .iter()
            .filter(|(_, slot)| !slot.is_expired(now))
            .map(|(key, slot)| key.len() + slot.value.approximate_size())
            .sum();

        let mut info = String::new();
        if section.is_none() || section == Some("server") {
            info.push_str("# Server\r\nstore_backend:memory\r\n");
        }
        if section.is_none() || section == Some("memory") {
            info.push_str(&format!("# Memory\r\nused_memory:{used_memory}\r\n"));
        }
        if section.is_none() || section == Some("keyspace") {
            info.push_str(&format!("# Keyspace\r\nkeys:{}\r\n", live.len()));
        }
        Ok(info)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_returns_none_on_miss() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        let ttl = store.ttl("k").await.unwrap();
        assert!(ttl > 0 && ttl <= 60);
    }

    #[tokio::test]
    async fn test_ttl_sentinels() {
        let store = MemoryStore::new();
        assert_eq!(store.ttl("nope").await.unwrap(), TTL_MISSING);
        store
            .sadd("set", &["a".to_string()])
            .await
            .unwrap();
        assert_eq!(store.ttl("set").await.unwrap(), TTL_NO_EXPIRY);
    }

    #[tokio::test]
    async fn test_expired_key_is_gone() {
        let store = MemoryStore::new();
        store.set_ex("short", "v", 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sets_and_del() {
        let store = MemoryStore::new();
        let added = store
            .sadd("tag:t", &["a".to_string(), "b".to_string(), "a".to_string()])
            .await
            .unwrap();
        assert_eq!(added, 2);

        let mut members = store.smembers("tag:t").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a".to_string(), "b".to_string()]);

        let removed = store
            .del(&["tag:t".to_string(), "other".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.smembers("tag:t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sadd_on_string_is_wrongtype() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        assert!(store.sadd("k", &["m".to_string()]).await.is_err());
    }

    #[tokio::test]
    async fn test_keys_glob_is_sorted() {
        let store = MemoryStore::new();
        for key in ["p:a:2", "p:a:1", "p:b:1"] {
            store.set_ex(key, "v", 60).await.unwrap();
        }
        assert_eq!(
            store.keys("p:a:*").await.unwrap(),
            vec!["p:a:1".to_string(), "p:a:2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_info_reports_used_memory() {
        let store = MemoryStore::new();
        store.set_ex("key", "value", 60).await.unwrap();
        let info = store.info(Some("memory")).await.unwrap();
        assert!(info.contains("used_memory:8"));
        assert!(!info.contains("# Server"));
    }
}
