//! # Cache System Bootstrap
//!
//! Composition root for the cache subsystem. Builds exactly one
//! [`CacheService`] around the configured store and shares it, via `Arc`,
//! with the query cache and the warmup service.
//!
//! ## Lifecycle
//!
//! 1. [`CacheSystem::bootstrap`] validates the configuration and connects the
//!    store (falling back to a disabled cache when it cannot)
//! 2. Stats collection starts when the cache is enabled
//! 3. Default warmup tasks are registered when a data source is supplied
//! 4. [`CacheSystem::start_scheduler`] starts periodic warmup
//! 5. [`CacheSystem::shutdown`] stops every background loop

use crate::cache::{CacheService, QueryCacheService};
use crate::config::PortalCacheConfig;
use crate::error::Result;
use crate::health::HealthReport;
use crate::store::{connect_graceful, KeyValueStore};
use crate::warmup::{CacheWarmupService, PortalDataSource, WarmupSchedule};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Running cache subsystem and its background loops
pub struct CacheSystem {
    pub config: PortalCacheConfig,
    pub cache: Arc<CacheService>,
    pub query_cache: Arc<QueryCacheService>,
    pub warmup: Arc<CacheWarmupService>,
    stats_task: Option<JoinHandle<()>>,
    schedule: Option<WarmupSchedule>,
}

/// Snapshot of the subsystem for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CacheSystemStatus {
    pub enabled: bool,
    pub backend: String,
    pub key_prefix: String,
    pub warmup_tasks: usize,
    pub stats_collection_running: bool,
    pub scheduler_running: bool,
}

/// Combined health of the cache and warmup services
#[derive(Debug, Clone, Serialize)]
pub struct CacheSystemHealth {
    pub cache: HealthReport,
    pub query_cache: HealthReport,
    pub warmup: HealthReport,
}

impl CacheSystem {
    /// Connect the configured store and assemble the services
    ///
    /// An unreachable store does not fail bootstrap; the cache runs disabled.
    pub async fn bootstrap(
        config: PortalCacheConfig,
        source: Option<Arc<dyn PortalDataSource>>,
    ) -> Result<Self> {
        info!("Bootstrapping cache system");
        config.validate()?;
        config.log_configuration();

        let store = connect_graceful(&config).await;
        Ok(Self::assemble(config, store, source))
    }

    /// Assemble the services around an explicit store
    pub fn with_store(
        config: PortalCacheConfig,
        store: Arc<dyn KeyValueStore>,
        source: Option<Arc<dyn PortalDataSource>>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, Some(store), source))
    }

    fn assemble(
        config: PortalCacheConfig,
        store: Option<Arc<dyn KeyValueStore>>,
        source: Option<Arc<dyn PortalDataSource>>,
    ) -> Self {
        let cache = Arc::new(CacheService::new(store, &config));

        let stats_task = cache
            .is_enabled()
            .then(|| cache.start_stats_collection(config.stats_refresh_interval()));

        let query_cache = Arc::new(QueryCacheService::new(Arc::clone(&cache)));
        let warmup = Arc::new(CacheWarmupService::new(
            Arc::clone(&cache),
            config.warmup.clone(),
        ));

        if let Some(source) = source {
            warmup.initialize(source);
        }

        info!(
            enabled = cache.is_enabled(),
            warmup_tasks = warmup.task_count(),
            "Cache system ready"
        );

        Self {
            config,
            cache,
            query_cache,
            warmup,
            stats_task,
            schedule: None,
        }
    }

    /// Start periodic warmup; a second call is a no-op
    pub fn start_scheduler(&mut self) {
        if self.schedule.is_some() {
            warn!("Warmup scheduler already running");
            return;
        }
        self.schedule = Some(self.warmup.schedule_warmup());
    }

    /// Stop stats collection and periodic warmup
    pub fn shutdown(&mut self) {
        if let Some(task) = self.stats_task.take() {
            task.abort();
        }
        if let Some(schedule) = self.schedule.take() {
            schedule.shutdown();
        }
        info!("Cache system shut down");
    }

    pub fn status(&self) -> CacheSystemStatus {
        CacheSystemStatus {
            enabled: self.cache.is_enabled(),
            backend: self.config.backend.clone(),
            key_prefix: self.cache.key_prefix().to_string(),
            warmup_tasks: self.warmup.task_count(),
            stats_collection_running: self
                .stats_task
                .as_ref()
                .is_some_and(|task| !task.is_finished()),
            scheduler_running: self
                .schedule
                .as_ref()
                .is_some_and(WarmupSchedule::is_running),
        }
    }

    pub async fn health_check(&self) -> CacheSystemHealth {
        CacheSystemHealth {
            cache: self.cache.health_check().await,
            query_cache: self.query_cache.health_check().await,
            warmup: self.warmup.health_check(),
        }
    }
}

impl Drop for CacheSystem {
    fn drop(&mut self) {
        if let Some(task) = self.stats_task.take() {
            task.abort();
        }
    }
}
