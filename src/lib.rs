#![allow(clippy::doc_markdown)] // Allow technical terms like Redis, DragonflyDB in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Portal Cache
//!
//! Tag-based, TTL-aware cache-aside layer over a Redis-compatible key-value
//! store, with prioritized, dependency-ordered cache warmup.
//!
//! ## Overview
//!
//! Application code reads through [`CacheService`]: a miss runs the caller's
//! producer and stores the result with a TTL and a set of tags, so related
//! entries can be invalidated together. [`QueryCacheService`] builds on it
//! for database queries, tagging each result with the tables it reads.
//! [`CacheWarmupService`] pre-populates hot keys on a schedule.
//!
//! ## Key Features
//!
//! - **Graceful degradation**: store failures become misses and no-ops, and a
//!   lost connection disables caching instead of failing requests
//! - **Tag invalidation**: every write is indexed under its tags
//! - **Ordered warmup**: dependencies first, then priority, with bounded
//!   concurrency and a per-task timeout
//! - **Pluggable store**: Redis via `ConnectionManager`, or in-memory
//!
//! ## Module Organization
//!
//! - [`bootstrap`] - Composition root wiring one shared cache into every service
//! - [`cache`] - Cache-aside service and query cache
//! - [`warmup`] - Warmup tasks, ordering, execution, and scheduling
//! - [`store`] - Key-value store trait and adapters
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portal_cache::bootstrap::CacheSystem;
//! use portal_cache::cache::CacheConfig;
//! use portal_cache::config::PortalCacheConfig;
//!
//! # async fn example() -> portal_cache::Result<()> {
//! portal_cache::logging::init_structured_logging();
//!
//! let mut system = CacheSystem::bootstrap(PortalCacheConfig::from_environment(), None).await?;
//! system.start_scheduler();
//!
//! let options = CacheConfig::with_ttl(300).tag("courses");
//! let courses: Result<Vec<String>, std::io::Error> = system
//!     .cache
//!     .get_or_set("courses:all", || async { Ok(vec!["Rust 101".to_string()]) }, &options)
//!     .await;
//! println!("{courses:?}");
//!
//! system.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test                                  # Unit and integration tests (in-memory store)
//! cargo test --features test-services         # Adds tests against REDIS_URL
//! cargo bench --features benchmarks           # Warmup ordering benchmarks
//! ```

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod health;
pub mod logging;
pub mod store;
pub mod warmup;

pub use bootstrap::{CacheSystem, CacheSystemHealth, CacheSystemStatus};
pub use cache::{
    CacheConfig, CacheEntry, CacheService, CacheStats, CacheStrategy, QueryCacheOptions,
    QueryCacheService, QueryStats, UsageAnalysis,
};
pub use config::{ConfigLoader, ConfigurationError, PortalCacheConfig, RedisConfig, WarmupConfig};
pub use error::{PortalCacheError, Result};
pub use health::{HealthReport, HealthStatus};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use warmup::{
    warmup_fn, CacheWarmupService, PortalDataSource, PriorityFilter, WarmupOptions,
    WarmupPriority, WarmupSchedule, WarmupStats, WarmupTask,
};
