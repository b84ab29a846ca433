//! # Cache Service
//!
//! Cache-aside facade over a [`KeyValueStore`]. Values are wrapped in a
//! [`CacheEntry`] envelope, indexed by tag for bulk invalidation, and
//! counted in [`CacheStats`].
//!
//! Store failures never reach callers: reads degrade to misses and writes to
//! no-ops. Only a producer passed to [`CacheService::get_or_set`] or
//! [`CacheService::query_cache`] can make an operation fail.

use super::entry::{self, CacheConfig, CacheEntry};
use super::safe::StoreGuard;
use super::stats::{parse_used_memory, AtomicCacheStats, CacheStats};
use crate::config::PortalCacheConfig;
use crate::constants::{tags, ttl, TAG_NAMESPACE};
use crate::health::{HealthReport, HealthStatus};
use crate::logging::log_cache_operation;
use crate::store::traits::TTL_MISSING;
use crate::store::{KeyValueStore, StoreError};
use crate::warmup::WarmupFn;
use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Tag-aware, TTL-aware cache over a shared store handle
pub struct CacheService {
    store: Option<Arc<dyn KeyValueStore>>,
    guard: StoreGuard,
    key_prefix: String,
    default_ttl: u64,
    healthy_latency_threshold: Duration,
    stats: AtomicCacheStats,
    warmup_tasks: DashMap<String, WarmupFn>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("store", &self.store.as_ref().map(|s| s.name()))
            .field("enabled", &self.is_enabled())
            .field("key_prefix", &self.key_prefix)
            .field("default_ttl", &self.default_ttl)
            .field("warmup_tasks", &self.warmup_tasks.len())
            .finish()
    }
}

impl CacheService {
    /// Build a service around `store`; without a store the service is disabled
    pub fn new(store: Option<Arc<dyn KeyValueStore>>, config: &PortalCacheConfig) -> Self {
        let enabled = config.enabled && store.is_some();
        if !enabled {
            info!("Cache service starting disabled");
        }

        Self {
            store,
            guard: StoreGuard::new(enabled),
            key_prefix: config.key_prefix.clone(),
            default_ttl: config.default_ttl_seconds,
            healthy_latency_threshold: Duration::from_millis(config.healthy_latency_threshold_ms),
            stats: AtomicCacheStats::default(),
            warmup_tasks: DashMap::new(),
        }
    }

    /// A service that never touches a store
    pub fn disabled(config: &PortalCacheConfig) -> Self {
        Self::new(None, config)
    }

    pub fn is_enabled(&self) -> bool {
        self.guard.is_enabled()
    }

    /// Turn caching back on after a connection failure disabled it
    ///
    /// Returns whether the service is enabled afterwards; a service built
    /// without a store stays disabled.
    pub fn reenable(&self) -> bool {
        if self.store.is_some() {
            self.guard.enable();
            info!("Cache service re-enabled");
        }
        self.is_enabled()
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}{}{}", self.key_prefix, TAG_NAMESPACE, tag)
    }

    fn active_store(&self) -> Option<&Arc<dyn KeyValueStore>> {
        if self.guard.is_enabled() {
            self.store.as_ref()
        } else {
            None
        }
    }

    /// Store `value` under `key` with the given options
    pub async fn set<T>(&self, key: &str, value: &T, config: &CacheConfig)
    where
        T: Serialize + ?Sized,
    {
        let Some(store) = self.active_store() else {
            return;
        };

        let ttl_seconds = config
            .ttl
            .filter(|ttl| *ttl > 0)
            .unwrap_or(self.default_ttl);
        let full_key = self.full_key(key);
        let envelope = CacheEntry::new(value, Utc::now().timestamp_millis(), ttl_seconds, config);

        let payload = match entry::encode(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        let written = self
            .guard
            .run("set", key, false, async {
                store.set_ex(&full_key, &payload, ttl_seconds).await.map(|_| true)
            })
            .await;
        if !written {
            return;
        }

        for tag in &config.tags {
            let tag_key = self.tag_key(tag);
            let member = [full_key.clone()];
            self.guard
                .run("tag", tag, (), async {
                    store.sadd(&tag_key, &member).await?;
                    store.expire(&tag_key, ttl_seconds).await?;
                    Ok::<(), StoreError>(())
                })
                .await;
        }

        self.stats.record_set();
        debug!(
            key = key,
            ttl_seconds = ttl_seconds,
            tags = ?config.tags,
            "Cache entry set"
        );
    }

    /// Read `key`, treating absent, stale, or unreadable entries as misses
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let store = self.active_store()?;
        let full_key = self.full_key(key);

        let raw = self
            .guard
            .run("get", key, None, store.get(&full_key))
            .await;
        let Some(raw) = raw else {
            self.stats.record_miss();
            return None;
        };

        let envelope: CacheEntry<T> = match entry::decode(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to decode cache entry");
                self.stats.record_miss();
                return None;
            }
        };

        if envelope.is_expired(Utc::now().timestamp_millis()) {
            self.delete(key).await;
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        debug!(key = key, "Cache hit");
        Some(envelope.data)
    }

    /// Cache-aside read: return the cached value or compute, store, and return it
    ///
    /// A failing `fallback` propagates its error unchanged and nothing is
    /// written. A disabled cache calls `fallback` directly.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        fallback: F,
        config: &CacheConfig,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.is_enabled() {
            return fallback().await;
        }

        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        debug!(key = key, "Cache miss, running fallback");
        let value = fallback().await?;
        self.set(key, &value, config).await;
        Ok(value)
    }

    /// [`get_or_set`](Self::get_or_set) under `query:<query_key>`, tagged `queries`
    pub async fn query_cache<T, E, F, Fut>(
        &self,
        query_key: &str,
        query_fn: F,
        config: &CacheConfig,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = format!("query:{query_key}");
        let config = config.layered(&[tags::QUERIES], self.default_ttl);
        self.get_or_set(&key, query_fn, &config).await
    }

    /// Long-lived write (24h unless overridden), tagged `static` unless the caller gives tags
    pub async fn static_cache<T>(&self, key: &str, value: &T, config: &CacheConfig)
    where
        T: Serialize + ?Sized,
    {
        let config = config.defaulted(&[tags::STATIC], ttl::STATIC_ENTRY);
        self.set(key, value, &config).await;
    }

    /// Short-lived write (5min unless overridden), tagged `dynamic` unless the caller gives tags
    pub async fn dynamic_cache<T>(&self, key: &str, value: &T, config: &CacheConfig)
    where
        T: Serialize + ?Sized,
    {
        let config = config.defaulted(&[tags::DYNAMIC], ttl::DYNAMIC_ENTRY);
        self.set(key, value, &config).await;
    }

    pub async fn delete(&self, key: &str) {
        let Some(store) = self.active_store() else {
            return;
        };
        let full_key = [self.full_key(key)];

        let deleted = self
            .guard
            .run("delete", key, false, async {
                store.del(&full_key).await.map(|_| true)
            })
            .await;
        if deleted {
            self.stats.record_deletes(1);
            debug!(key = key, "Cache entry deleted");
        }
    }

    /// Delete every key indexed under `tag`, then the index itself
    pub async fn invalidate_by_tag(&self, tag: &str) {
        let Some(store) = self.active_store() else {
            return;
        };
        let tag_key = self.tag_key(tag);

        let members = self
            .guard
            .run("invalidate_by_tag", tag, Vec::new(), store.smembers(&tag_key))
            .await;
        if members.is_empty() {
            return;
        }

        let tag_index = [tag_key];
        let removed = self
            .guard
            .run("invalidate_by_tag", tag, false, async {
                store.del(&members).await?;
                store.del(&tag_index).await?;
                Ok::<bool, StoreError>(true)
            })
            .await;
        if removed {
            self.stats.record_deletes(members.len() as u64);
            info!(tag = tag, count = members.len(), "Invalidated cache entries by tag");
        }
    }

    /// Delete every key matching the glob `pattern` (relative to the prefix)
    pub async fn delete_by_pattern(&self, pattern: &str) {
        let Some(store) = self.active_store() else {
            return;
        };
        let full_pattern = self.full_key(pattern);

        let keys = self
            .guard
            .run("delete_by_pattern", pattern, Vec::new(), store.keys(&full_pattern))
            .await;
        if keys.is_empty() {
            return;
        }

        let removed = self
            .guard
            .run("delete_by_pattern", pattern, false, async {
                store.del(&keys).await.map(|_| true)
            })
            .await;
        if removed {
            self.stats.record_deletes(keys.len() as u64);
            info!(pattern = pattern, count = keys.len(), "Deleted cache entries by pattern");
        }
    }

    /// Register (or replace) a named warmup producer
    pub fn register_warmup_task(&self, key: impl Into<String>, task: WarmupFn) {
        let key = key.into();
        debug!(task = %key, "Warmup task registered");
        self.warmup_tasks.insert(key, task);
    }

    /// Registered warmup task keys, sorted
    pub fn warmup_task_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.warmup_tasks.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Run all registered warmup tasks, or the named subset, concurrently
    ///
    /// Unknown names are skipped. Failures are logged and never returned.
    pub async fn warmup(&self, keys: Option<&[String]>) {
        if !self.is_enabled() {
            return;
        }

        let selected: Vec<(String, WarmupFn)> = match keys {
            Some(keys) => keys
                .iter()
                .filter_map(|key| {
                    self.warmup_tasks
                        .get(key)
                        .map(|task| (key.clone(), Arc::clone(task.value())))
                })
                .collect(),
            None => self
                .warmup_tasks
                .iter()
                .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
                .collect(),
        };

        info!(count = selected.len(), "Starting cache warmup");

        let runs = selected.into_iter().map(|(key, task)| async move {
            match tokio::spawn(task()).await {
                Ok(Ok(())) => debug!(task = %key, "Warmup task completed"),
                Ok(Err(e)) => error!(task = %key, error = %e, "Warmup task failed"),
                Err(e) => error!(task = %key, error = %e, "Warmup task aborted"),
            }
        });
        join_all(runs).await;

        info!("Cache warmup finished");
    }

    /// Delete every key under the prefix
    pub async fn clear(&self) {
        let Some(store) = self.active_store() else {
            return;
        };
        let pattern = self.full_key("*");

        let keys = self
            .guard
            .run("clear", &pattern, Vec::new(), store.keys(&pattern))
            .await;
        if keys.is_empty() {
            return;
        }

        let cleared = self
            .guard
            .run("clear", &pattern, false, async {
                store.del(&keys).await.map(|_| true)
            })
            .await;
        if cleared {
            log_cache_operation(
                "clear",
                &pattern,
                "completed",
                Some(&format!("{} keys removed", keys.len())),
            );
        }
    }

    pub fn get_stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Ping-latency health check
    pub async fn health_check(&self) -> HealthReport {
        let Some(store) = self.active_store() else {
            return HealthReport::unhealthy("Cache disabled");
        };

        let start = Instant::now();
        if let Err(e) = store.ping().await {
            return HealthReport::unhealthy(e);
        }
        let latency = start.elapsed();

        let info = match store.info(None).await {
            Ok(info) => info,
            Err(e) => return HealthReport::unhealthy(e),
        };

        let status = if latency < self.healthy_latency_threshold {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthReport::new(
            status,
            json!({
                "latency_ms": latency.as_millis() as u64,
                "stats": self.get_stats(),
                "store": store.name(),
                "store_info": info,
                "enabled": self.is_enabled(),
            }),
        )
    }

    /// Up to `limit` prefixed keys that still have a positive TTL
    pub async fn key_ttls(&self, limit: usize) -> Vec<(String, i64)> {
        let Some(store) = self.active_store() else {
            return Vec::new();
        };
        let pattern = self.full_key("*");

        let keys = self
            .guard
            .run("key_ttls", &pattern, Vec::new(), store.keys(&pattern))
            .await;

        let mut ttls = Vec::new();
        for key in keys.into_iter().take(limit) {
            let remaining = self
                .guard
                .run("ttl", &key, TTL_MISSING, store.ttl(&key))
                .await;
            if remaining > 0 {
                ttls.push((key, remaining));
            }
        }
        ttls
    }

    /// Refresh `memory_usage` from the store's memory report
    pub async fn refresh_memory_usage(&self) {
        let Some(store) = self.active_store() else {
            return;
        };

        let info = self
            .guard
            .run("info", "memory", None, async {
                store.info(Some("memory")).await.map(Some)
            })
            .await;
        if let Some(bytes) = info.as_deref().and_then(parse_used_memory) {
            self.stats.set_memory_usage(bytes);
        }
    }

    /// Spawn a loop refreshing `memory_usage` every `interval`
    pub fn start_stats_collection(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            debug!(interval_ms = interval.as_millis() as u64, "Starting cache stats collection");
            loop {
                timer.tick().await;
                service.refresh_memory_usage().await;
            }
        })
    }
}
