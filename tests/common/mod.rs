//! Shared store doubles for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use portal_cache::config::PortalCacheConfig;
use portal_cache::store::{KeyValueStore, MemoryStore, StoreError, StoreResult};
use portal_cache::CacheService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Memory store that counts every command it receives
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    writes: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total commands issued against the store
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `SET` commands only
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.record();
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        self.record();
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_ex(key, value, ttl_seconds).await
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        self.record();
        self.inner.del(keys).await
    }

    async fn sadd(&self, set_key: &str, members: &[String]) -> StoreResult<u64> {
        self.record();
        self.inner.sadd(set_key, members).await
    }

    async fn smembers(&self, set_key: &str) -> StoreResult<Vec<String>> {
        self.record();
        self.inner.smembers(set_key).await
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        self.record();
        self.inner.expire(key, ttl_seconds).await
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.record();
        self.inner.keys(pattern).await
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        self.record();
        self.inner.ttl(key).await
    }

    async fn ping(&self) -> StoreResult<String> {
        self.record();
        self.inner.ping().await
    }

    async fn info(&self, section: Option<&str>) -> StoreResult<String> {
        self.record();
        self.inner.info(section).await
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Memory store whose `PING` answers after a fixed delay
#[derive(Debug)]
pub struct SlowPingStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowPingStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl KeyValueStore for SlowPingStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        self.inner.set_ex(key, value, ttl_seconds).await
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        self.inner.del(keys).await
    }

    async fn sadd(&self, set_key: &str, members: &[String]) -> StoreResult<u64> {
        self.inner.sadd(set_key, members).await
    }

    async fn smembers(&self, set_key: &str) -> StoreResult<Vec<String>> {
        self.inner.smembers(set_key).await
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        self.inner.expire(key, ttl_seconds).await
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.inner.keys(pattern).await
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        self.inner.ttl(key).await
    }

    async fn ping(&self) -> StoreResult<String> {
        tokio::time::sleep(self.delay).await;
        self.inner.ping().await
    }

    async fn info(&self, section: Option<&str>) -> StoreResult<String> {
        self.inner.info(section).await
    }

    fn name(&self) -> &'static str {
        "slow_ping"
    }
}

/// How [`FailingStore`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Connection,
    Command,
}

/// Store whose every command fails
#[derive(Debug)]
pub struct FailingStore {
    mode: FailureMode,
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(mode: FailureMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, command: &str) -> StoreResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(match self.mode {
            FailureMode::Connection => StoreError::Connection(format!("{command}: connection refused")),
            FailureMode::Command => StoreError::Command(format!("{command}: WRONGTYPE")),
        })
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        self.fail("GET")
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> StoreResult<()> {
        self.fail("SET")
    }

    async fn del(&self, _keys: &[String]) -> StoreResult<u64> {
        self.fail("DEL")
    }

    async fn sadd(&self, _set_key: &str, _members: &[String]) -> StoreResult<u64> {
        self.fail("SADD")
    }

    async fn smembers(&self, _set_key: &str) -> StoreResult<Vec<String>> {
        self.fail("SMEMBERS")
    }

    async fn expire(&self, _key: &str, _ttl_seconds: u64) -> StoreResult<bool> {
        self.fail("EXPIRE")
    }

    async fn keys(&self, _pattern: &str) -> StoreResult<Vec<String>> {
        self.fail("KEYS")
    }

    async fn ttl(&self, _key: &str) -> StoreResult<i64> {
        self.fail("TTL")
    }

    async fn ping(&self) -> StoreResult<String> {
        self.fail("PING")
    }

    async fn info(&self, _section: Option<&str>) -> StoreResult<String> {
        self.fail("INFO")
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Cache service over `store` with test configuration
pub fn cache_over<S: KeyValueStore + 'static>(store: &Arc<S>) -> Arc<CacheService> {
    let store: Arc<dyn KeyValueStore> = store.clone();
    Arc::new(CacheService::new(Some(store), &PortalCacheConfig::for_test()))
}
