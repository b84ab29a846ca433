//! # Cache Warmup Service
//!
//! Runs registered producers ahead of demand so hot keys are already cached
//! when requests arrive.
//!
//! A run moves through: filter by priority, order by dependencies
//! ([`order_tasks`]), then execute in batches of `max_concurrent`. Each task
//! is spawned onto the runtime and raced against the per-task timeout. A task
//! that loses the race keeps running detached; only its result is discarded.
//! Errors, panics, and timeouts all count as failures and never abort the run.

use super::defaults::{default_tasks, PortalDataSource};
use super::ordering::order_tasks;
use super::stats::WarmupStats;
use super::task::{PriorityFilter, TaskSummary, WarmupPriority, WarmupTask};
use crate::cache::CacheService;
use crate::config::WarmupConfig;
use crate::error::{PortalCacheError, Result};
use crate::health::{HealthReport, HealthStatus};
use chrono::Utc;
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Options for a single warmup run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupOptions {
    pub priority: PriorityFilter,
    /// Tasks started together per batch
    pub max_concurrent: usize,
    /// Per-task time budget
    pub timeout: Duration,
}

impl Default for WarmupOptions {
    fn default() -> Self {
        Self {
            priority: PriorityFilter::All,
            max_concurrent: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

impl WarmupOptions {
    /// Options for `priority` with batch size and timeout from `config`
    pub fn from_config(config: &WarmupConfig, priority: PriorityFilter) -> Self {
        Self {
            priority,
            max_concurrent: config.max_concurrent,
            timeout: config.task_timeout(),
        }
    }

    pub fn with_priority(mut self, priority: PriorityFilter) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Prioritized, dependency-ordered warmup runner
pub struct CacheWarmupService {
    cache: Arc<CacheService>,
    config: WarmupConfig,
    tasks: RwLock<Vec<WarmupTask>>,
    stats: RwLock<WarmupStats>,
}

impl std::fmt::Debug for CacheWarmupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWarmupService")
            .field("tasks", &self.tasks.read().len())
            .field("config", &self.config)
            .finish()
    }
}

impl CacheWarmupService {
    pub fn new(cache: Arc<CacheService>, config: WarmupConfig) -> Self {
        Self {
            cache,
            config,
            tasks: RwLock::new(Vec::new()),
            stats: RwLock::new(WarmupStats::default()),
        }
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    pub fn config(&self) -> &WarmupConfig {
        &self.config
    }

    /// Register `task`, replacing any task with the same key in place
    ///
    /// The producer is also registered with the cache service under the same key.
    pub fn register_task(&self, task: WarmupTask) {
        self.cache
            .register_warmup_task(task.key.clone(), Arc::clone(&task.task));
        debug!(task = %task.key, priority = %task.priority, "Warmup task registered");

        let mut tasks = self.tasks.write();
        match tasks.iter_mut().find(|existing| existing.key == task.key) {
            Some(existing) => *existing = task,
            None => tasks.push(task),
        }
    }

    /// Register the standard portal tasks backed by `source`
    pub fn initialize(&self, source: Arc<dyn PortalDataSource>) {
        info!("Registering default warmup tasks");
        for task in default_tasks(&self.cache, source) {
            self.register_task(task);
        }
        info!(count = self.task_count(), "Warmup tasks registered");
    }

    pub fn task_count(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn list_tasks(&self) -> Vec<TaskSummary> {
        self.tasks.read().iter().map(WarmupTask::summary).collect()
    }

    pub fn get_stats(&self) -> WarmupStats {
        self.stats.read().clone()
    }

    /// Run the selected tasks and return the statistics of this run
    pub async fn warmup_cache(&self, options: WarmupOptions) -> WarmupStats {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        info!(
            run_id = %run_id,
            priority = options.priority.as_str(),
            max_concurrent = options.max_concurrent,
            "Starting cache warmup"
        );

        let selected: Vec<WarmupTask> = self
            .tasks
            .read()
            .iter()
            .filter(|task| options.priority.matches(task.priority))
            .cloned()
            .collect();
        debug!(run_id = %run_id, selected = selected.len(), "Warmup tasks filtered");

        let ordered = order_tasks(&selected);
        debug!(
            run_id = %run_id,
            order = ?ordered.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
            "Warmup tasks ordered"
        );

        self.stats.write().begin(run_id, ordered.len());

        for batch in ordered.chunks(options.max_concurrent.max(1)) {
            join_all(
                batch
                    .iter()
                    .map(|task| self.run_and_record(task, options.timeout, run_id)),
            )
            .await;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let stats = {
            let mut stats = self.stats.write();
            stats.finish(duration_ms);
            stats.clone()
        };

        info!(
            run_id = %run_id,
            completed = stats.completed_tasks,
            failed = stats.failed_tasks,
            total = stats.total_tasks,
            duration_ms = duration_ms,
            "Cache warmup finished"
        );
        stats
    }

    async fn run_and_record(&self, task: &WarmupTask, timeout: Duration, run_id: Uuid) {
        match execute_with_timeout(task, timeout).await {
            Ok(()) => {
                self.stats.write().completed_tasks += 1;
                debug!(run_id = %run_id, task = %task.key, "Warmup task completed");
            }
            Err(e) => {
                self.stats.write().failed_tasks += 1;
                error!(run_id = %run_id, task = %task.key, error = %e, "Warmup task failed");
            }
        }
    }

    /// Refresh high-priority tasks when cached keys are about to expire
    ///
    /// Inspects up to `incremental_scan_limit` prefixed keys. Returns the run
    /// statistics when a refresh was triggered.
    pub async fn incremental_warmup(&self) -> Option<WarmupStats> {
        info!("Starting incremental warmup");

        let ttls = self.cache.key_ttls(self.config.incremental_scan_limit).await;
        let expiring = ttls
            .iter()
            .filter(|(_, ttl)| *ttl < self.config.expiring_threshold_seconds)
            .count();

        if expiring == 0 {
            debug!(scanned = ttls.len(), "No keys close to expiry");
            return None;
        }

        info!(expiring = expiring, "Refreshing keys close to expiry");
        let options = WarmupOptions::from_config(&self.config, WarmupPriority::High.into())
            .with_max_concurrent(self.config.incremental_max_concurrent);
        Some(self.warmup_cache(options).await)
    }

    /// Success-rate health check over the most recent run
    pub fn health_check(&self) -> HealthReport {
        let stats = self.get_stats();
        let success_rate = stats.success_rate();

        let status = if success_rate >= 0.8 {
            HealthStatus::Healthy
        } else if success_rate >= 0.5 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        let since_last_run_ms = (Utc::now() - stats.last_run).num_milliseconds();
        HealthReport::new(
            status,
            json!({
                "stats": stats,
                "tasks_registered": self.task_count(),
                "success_rate": success_rate,
                "time_since_last_run_ms": since_last_run_ms,
            }),
        )
    }
}

/// Spawn `task` and wait at most `timeout` for it
///
/// On timeout the join handle is dropped, which detaches the task.
async fn execute_with_timeout(task: &WarmupTask, timeout: Duration) -> Result<()> {
    let handle = tokio::spawn((task.task)());

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(source))) => Err(PortalCacheError::WarmupFailed {
            key: task.key.clone(),
            source,
        }),
        Ok(Err(join_error)) => Err(PortalCacheError::WarmupAborted {
            key: task.key.clone(),
            reason: join_error.to_string(),
        }),
        Err(_) => Err(PortalCacheError::WarmupTimeout {
            key: task.key.clone(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
