//! # Cache Services
//!
//! Cache-aside access to the key-value store.
//!
//! ## Components
//!
//! - [`CacheService`]: get/set/delete with TTL and tag metadata, tag and
//!   pattern invalidation, stats, health, and a registry of named warmup
//!   producers
//! - [`QueryCacheService`]: database-query caching with `table:<name>` tags
//!   and per-table invalidation
//! - [`CacheEntry`] / [`CacheConfig`]: stored envelope and per-write options
//!
//! ## Failure model
//!
//! Store errors are caught per operation, logged with the key, tag, or pattern
//! involved, and replaced by a neutral result (miss, no-op). A broken
//! connection switches the service off until [`CacheService::reenable`].
//!
//! ```rust
//! use portal_cache::cache::{CacheConfig, CacheService};
//! use portal_cache::config::PortalCacheConfig;
//! use portal_cache::store::{KeyValueStore, MemoryStore};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
//! let cache = CacheService::new(Some(store), &PortalCacheConfig::for_test());
//!
//! cache.set("user:1", &"Ana", &CacheConfig::with_ttl(60).tag("users")).await;
//! assert_eq!(cache.get::<String>("user:1").await.as_deref(), Some("Ana"));
//!
//! cache.invalidate_by_tag("users").await;
//! assert_eq!(cache.get::<String>("user:1").await, None);
//! # });
//! ```

pub mod entry;
pub mod query;
pub(crate) mod safe;
pub mod service;
pub mod stats;

pub use entry::{CacheConfig, CacheEntry, CacheStrategy};
pub use query::{QueryCacheOptions, QueryCacheService, QueryStats, UsageAnalysis};
pub use service::CacheService;
pub use stats::CacheStats;
