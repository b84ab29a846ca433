//! Store construction with graceful degradation
//!
//! The cache is a performance optimisation, so a store that cannot be built
//! never blocks startup: the caller gets `None` and runs with caching
//! disabled.

use super::providers::MemoryStore;
use super::traits::KeyValueStore;
use crate::config::PortalCacheConfig;
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(feature = "cache-redis")]
use super::providers::RedisStore;

/// Build the configured store, or `None` when caching must run disabled
pub async fn connect_graceful(config: &PortalCacheConfig) -> Option<Arc<dyn KeyValueStore>> {
    if !config.enabled {
        info!("Portal cache disabled by configuration");
        return None;
    }

    match config.backend.as_str() {
        "redis" | "dragonfly" => connect_redis(config).await,
        "memory" | "in-memory" => {
            info!(backend = "memory", "In-memory cache store initialized");
            Some(Arc::new(MemoryStore::new()))
        }
        other => {
            warn!(backend = other, "Unknown cache backend, running with cache disabled");
            None
        }
    }
}

#[cfg(feature = "cache-redis")]
async fn connect_redis(config: &PortalCacheConfig) -> Option<Arc<dyn KeyValueStore>> {
    match RedisStore::from_config(&config.redis).await {
        Ok(store) => {
            info!(backend = "redis", "Cache store connected");
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!(
                error = %e,
                "Failed to connect to Redis, running with cache disabled (graceful degradation)"
            );
            None
        }
    }
}

#[cfg(not(feature = "cache-redis"))]
async fn connect_redis(_config: &PortalCacheConfig) -> Option<Arc<dyn KeyValueStore>> {
    warn!("Redis cache backend requested but 'cache-redis' feature not enabled, cache disabled");
    None
}
