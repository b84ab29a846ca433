//! # Query Cache
//!
//! Database-query caching on top of [`CacheService`]. Results are tagged with
//! `table:<name>` for every table they read, so a write to a table can drop
//! every dependent result with [`QueryCacheService::invalidate_by_table`].
//!
//! Hit/miss counts and a rolling window of execution times feed
//! [`QueryStats`], usage recommendations, and a health check.

use super::entry::CacheConfig;
use super::service::CacheService;
use crate::constants::{tags, ttl};
use crate::health::{HealthReport, HealthStatus};
use crate::warmup::PortalDataSource;
use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Execution-time samples kept for the rolling average
pub const MAX_EXECUTION_HISTORY: usize = 1000;

/// Options for [`QueryCacheService::cached_query`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCacheOptions {
    /// Seconds; defaults to the query TTL
    pub ttl: Option<u64>,
    pub tags: Vec<String>,
    /// Each table adds a `table:<name>` tag
    pub invalidate_on_tables: Vec<String>,
    pub key_prefix: String,
    pub compress: bool,
}

impl Default for QueryCacheOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            tags: vec![tags::QUERIES.to_string()],
            invalidate_on_tables: Vec::new(),
            key_prefix: "query".to_string(),
            compress: false,
        }
    }
}

impl QueryCacheOptions {
    fn entity(key_prefix: &str, ttl: u64, tags: &[&str], tables: &[&str]) -> Self {
        Self {
            ttl: Some(ttl),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            invalidate_on_tables: tables.iter().map(|t| (*t).to_string()).collect(),
            key_prefix: key_prefix.to_string(),
            compress: false,
        }
    }

    fn cache_config(&self) -> CacheConfig {
        CacheConfig::with_ttl(self.ttl.unwrap_or(ttl::QUERY))
            .tags(self.tags.iter().cloned())
            .tags(self.invalidate_on_tables.iter().map(|t| tags::table(t)))
            .compress(self.compress)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    pub total_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub avg_execution_time_ms: f64,
    pub cache_hit_ratio: f64,
}

/// Output of [`QueryCacheService::analyze_usage_patterns`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageAnalysis {
    pub hit_ratio: f64,
    pub avg_execution_time_ms: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Default)]
struct QueryStatsState {
    stats: QueryStats,
    execution_times: VecDeque<u64>,
}

impl QueryStatsState {
    fn record(&mut self, hit: bool, elapsed_ms: u64) {
        self.stats.total_queries += 1;
        if hit {
            self.stats.cache_hits += 1;
        } else {
            self.stats.cache_misses += 1;
        }

        self.execution_times.push_back(elapsed_ms);
        if self.execution_times.len() > MAX_EXECUTION_HISTORY {
            self.execution_times.pop_front();
        }

        let total: u64 = self.execution_times.iter().sum();
        self.stats.avg_execution_time_ms = total as f64 / self.execution_times.len() as f64;
        self.stats.cache_hit_ratio =
            self.stats.cache_hits as f64 / self.stats.total_queries as f64;
    }
}

/// Tables whose writes invalidate cached results for an entity type
pub fn entity_tables(entity: &str) -> Vec<String> {
    let tables: &[&str] = match entity {
        "user" => &["users", "user_roles", "user_sessions", "user_progress"],
        "course" => &["courses", "course_users", "course_content", "course_progress"],
        "book" => &["books", "book_progress", "book_annotations"],
        "institution" => &["institutions", "institution_users", "institution_courses"],
        other => return vec![other.to_string()],
    };
    tables.iter().map(|t| (*t).to_string()).collect()
}

/// SHA-256 hex digest of `filters` with object keys in sorted order
pub fn hash_filters(filters: &Value) -> String {
    let canonical = match filters {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            serde_json::to_string(&sorted)
        }
        other => serde_json::to_string(other),
    }
    .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Query-result cache with per-table invalidation and usage statistics
#[derive(Debug)]
pub struct QueryCacheService {
    cache: Arc<CacheService>,
    state: Mutex<QueryStatsState>,
}

impl QueryCacheService {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self {
            cache,
            state: Mutex::new(QueryStatsState::default()),
        }
    }

    /// Return the cached result for `query_key` or run `query_fn` and cache it
    ///
    /// The stored key is `<key_prefix>:<query_key>`. Errors from `query_fn`
    /// are logged and returned unchanged; nothing is cached for them.
    pub async fn cached_query<T, E, F, Fut>(
        &self,
        query_key: &str,
        query_fn: F,
        options: QueryCacheOptions,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cache_key = format!("{}:{}", options.key_prefix, query_key);
        let start = Instant::now();

        if let Some(cached) = self.cache.get::<T>(&cache_key).await {
            self.record(true, start);
            debug!(query = query_key, "Query cache hit");
            return Ok(cached);
        }

        debug!(query = query_key, "Query cache miss");
        let result = match query_fn().await {
            Ok(result) => result,
            Err(e) => {
                error!(query = query_key, error = %e, "Cached query failed");
                return Err(e);
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        self.cache
            .set(&cache_key, &result, &options.cache_config())
            .await;
        self.record(false, start);
        debug!(query = query_key, elapsed_ms = elapsed_ms, "Query result cached");

        Ok(result)
    }

    pub async fn cache_user_query<T, E, F, Fut>(
        &self,
        query_fn: F,
        filters: &Value,
        ttl_override: Option<u64>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let options = QueryCacheOptions::entity(
            "user_query",
            ttl_override.unwrap_or(ttl::MEDIUM),
            &["users", tags::QUERIES],
            &["users", "user_roles", "user_sessions"],
        );
        let key = format!("users:{}", hash_filters(filters));
        self.cached_query(&key, query_fn, options).await
    }

    pub async fn cache_course_query<T, E, F, Fut>(
        &self,
        query_fn: F,
        filters: &Value,
        ttl_override: Option<u64>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let options = QueryCacheOptions::entity(
            "course_query",
            ttl_override.unwrap_or(ttl::LONG),
            &["courses", tags::QUERIES],
            &["courses", "course_users", "course_content"],
        );
        let key = format!("courses:{}", hash_filters(filters));
        self.cached_query(&key, query_fn, options).await
    }

    pub async fn cache_book_query<T, E, F, Fut>(
        &self,
        query_fn: F,
        filters: &Value,
        ttl_override: Option<u64>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let options = QueryCacheOptions::entity(
            "book_query",
            ttl_override.unwrap_or(ttl::LONG),
            &["books", tags::QUERIES],
            &["books", "book_progress", "book_annotations"],
        );
        let key = format!("books:{}", hash_filters(filters));
        self.cached_query(&key, query_fn, options).await
    }

    pub async fn cache_institution_query<T, E, F, Fut>(
        &self,
        query_fn: F,
        filters: &Value,
        ttl_override: Option<u64>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let options = QueryCacheOptions::entity(
            "institution_query",
            ttl_override.unwrap_or(ttl::LONG),
            &["institutions", tags::QUERIES],
            &["institutions", "institution_users", "institution_courses"],
        );
        let key = format!("institutions:{}", hash_filters(filters));
        self.cached_query(&key, query_fn, options).await
    }

    /// Statistics for `period`, bucketed into five-minute windows
    pub async fn cache_stats_query<T, E, F, Fut>(
        &self,
        query_fn: F,
        period: &str,
        ttl_override: Option<u64>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let options = QueryCacheOptions::entity(
            "stats_query",
            ttl_override.unwrap_or(ttl::SHORT),
            &["stats", tags::QUERIES],
            &["users", "courses", "books", "user_sessions"],
        );
        let bucket = Utc::now().timestamp() / ttl::SHORT as i64;
        let key = format!("stats:{period}:{bucket}");
        self.cached_query(&key, query_fn, options).await
    }

    pub async fn cache_dashboard_query<T, E, F, Fut>(
        &self,
        query_fn: F,
        user_id: &str,
        ttl_override: Option<u64>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let user_tag = format!("user:{user_id}");
        let options = QueryCacheOptions::entity(
            "dashboard_query",
            ttl_override.unwrap_or(ttl::SHORT),
            &["dashboard", tags::QUERIES, user_tag.as_str()],
            &["courses", "books", "user_progress", "announcements"],
        );
        let key = format!("dashboard:{user_id}");
        self.cached_query(&key, query_fn, options).await
    }

    /// Drop every cached result that read `table`
    pub async fn invalidate_by_table(&self, table: &str) {
        self.cache.invalidate_by_tag(&tags::table(table)).await;
        info!(table = table, "Invalidated query cache for table");
    }

    pub async fn invalidate_by_tables<S: AsRef<str>>(&self, tables: &[S]) {
        join_all(tables.iter().map(|t| self.invalidate_by_table(t.as_ref()))).await;
    }

    /// Drop cached results for every table behind `entity` (see [`entity_tables`])
    pub async fn invalidate_by_entity(&self, entity: &str) {
        self.invalidate_by_tables(&entity_tables(entity)).await;
    }

    /// Pre-warm the most common listing and stats queries from `source`
    ///
    /// Each query is independent: a failed fetch is logged and the rest still
    /// run. Returns how many queries ended up cached.
    pub async fn warmup_common_queries(&self, source: &dyn PortalDataSource) -> usize {
        info!("Starting common query warmup");
        let outcomes = [
            self.cache_user_query(|| source.active_users(), &json!({"active": true}), None)
                .await
                .is_ok(),
            self.cache_course_query(|| source.popular_courses(), &json!({"active": true}), None)
                .await
                .is_ok(),
            self.cache_book_query(|| source.popular_books(), &json!({"popular": true}), None)
                .await
                .is_ok(),
            self.cache_stats_query(|| source.dashboard_stats(), "basic", None)
                .await
                .is_ok(),
        ];

        let warmed = outcomes.iter().filter(|ok| **ok).count();
        info!(
            warmed = warmed,
            failed = outcomes.len() - warmed,
            "Common query warmup finished"
        );
        warmed
    }

    fn record(&self, hit: bool, start: Instant) {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        self.state.lock().record(hit, elapsed_ms);
    }

    pub fn get_stats(&self) -> QueryStats {
        self.state.lock().stats
    }

    pub fn reset_stats(&self) {
        *self.state.lock() = QueryStatsState::default();
    }

    pub fn analyze_usage_patterns(&self) -> UsageAnalysis {
        let stats = self.get_stats();
        let mut recommendations = Vec::new();

        if stats.total_queries > 0 {
            if stats.cache_hit_ratio < 0.5 {
                recommendations.push(
                    "Low hit ratio - consider longer TTLs or a better caching strategy".to_string(),
                );
            } else if stats.cache_hit_ratio > 0.9 {
                recommendations
                    .push("Very high hit ratio - consider shorter TTLs for fresher data".to_string());
            }
        }

        if stats.avg_execution_time_ms > 1000.0 {
            recommendations.push(
                "High average execution time - consider optimizing queries or caching more"
                    .to_string(),
            );
        }

        if stats.total_queries > 10_000 {
            recommendations
                .push("High query volume - consider predictive cache warmup".to_string());
        }

        UsageAnalysis {
            hit_ratio: stats.cache_hit_ratio,
            avg_execution_time_ms: stats.avg_execution_time_ms,
            recommendations,
        }
    }

    /// Hit ratio below 0.3 or average above 2s is unhealthy; below 0.6 or
    /// above 1s is degraded. No traffic yet counts as healthy.
    pub async fn health_check(&self) -> HealthReport {
        let stats = self.get_stats();
        let analysis = self.analyze_usage_patterns();

        let status = if stats.total_queries == 0 {
            HealthStatus::Healthy
        } else if stats.cache_hit_ratio < 0.3 || stats.avg_execution_time_ms > 2000.0 {
            HealthStatus::Unhealthy
        } else if stats.cache_hit_ratio < 0.6 || stats.avg_execution_time_ms > 1000.0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthReport::new(
            status,
            json!({
                "stats": stats,
                "analysis": analysis,
                "cache_service_health": self.cache.health_check().await,
            }),
        )
    }
}
