//! Periodic warmup loops
//!
//! Three independent interval loops: a full run, an incremental refresh, and
//! a high-priority run. Each tick spawns its run, so a slow run never delays
//! the next tick and runs from different loops may overlap.

use super::service::{CacheWarmupService, WarmupOptions};
use super::task::PriorityFilter;
use crate::logging::log_warmup_operation;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Handles of the running warmup loops
#[derive(Debug)]
pub struct WarmupSchedule {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl WarmupSchedule {
    /// Names of loops that are still running
    pub fn active_loops(&self) -> Vec<&'static str> {
        self.handles
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_running(&self) -> bool {
        !self.active_loops().is_empty()
    }

    /// Abort every loop; runs already spawned finish on their own
    pub fn shutdown(&self) {
        for (name, handle) in &self.handles {
            handle.abort();
            debug!(schedule = name, "Warmup loop stopped");
        }
        info!("Warmup schedule shut down");
    }
}

impl Drop for WarmupSchedule {
    fn drop(&mut self) {
        for (_, handle) in &self.handles {
            handle.abort();
        }
    }
}

/// Shortest cadence a loop runs at; zero intervals are raised to this
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

fn spawn_loop<F, Fut>(name: &'static str, period: Duration, run: F) -> (&'static str, JoinHandle<()>)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if period < MIN_PERIOD {
        warn!(
            schedule = name,
            period_ms = period.as_millis() as u64,
            min_period_ms = MIN_PERIOD.as_millis() as u64,
            "Warmup interval below minimum, clamping"
        );
    }
    let period = period.max(MIN_PERIOD);

    let handle = tokio::spawn(async move {
        // First run after one full period
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            log_warmup_operation(name, None, None, "scheduled", None);
            tokio::spawn(run());
        }
    });
    (name, handle)
}

impl CacheWarmupService {
    /// Start the full, incremental, and high-priority loops
    ///
    /// Cadences come from the warmup configuration. Dropping or shutting
    /// down the returned schedule stops the loops.
    pub fn schedule_warmup(self: &Arc<Self>) -> WarmupSchedule {
        let config = self.config().clone();

        let full = {
            let service = Arc::clone(self);
            let options = WarmupOptions::from_config(&config, PriorityFilter::All);
            spawn_loop(
                "full",
                Duration::from_secs(config.full_interval_seconds),
                move || {
                    let service = Arc::clone(&service);
                    async move {
                        service.warmup_cache(options).await;
                    }
                },
            )
        };

        let incremental = {
            let service = Arc::clone(self);
            spawn_loop(
                "incremental",
                Duration::from_secs(config.incremental_interval_seconds),
                move || {
                    let service = Arc::clone(&service);
                    async move {
                        service.incremental_warmup().await;
                    }
                },
            )
        };

        let high = {
            let service = Arc::clone(self);
            let options = WarmupOptions::from_config(&config, PriorityFilter::High);
            spawn_loop(
                "high_priority",
                Duration::from_secs(config.high_priority_interval_seconds),
                move || {
                    let service = Arc::clone(&service);
                    async move {
                        service.warmup_cache(options).await;
                    }
                },
            )
        };

        info!(
            full_interval_seconds = config.full_interval_seconds,
            incremental_interval_seconds = config.incremental_interval_seconds,
            high_priority_interval_seconds = config.high_priority_interval_seconds,
            "Automatic warmup scheduled"
        );

        WarmupSchedule {
            handles: vec![full, incremental, high],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheService;
    use crate::config::{PortalCacheConfig, WarmupConfig};
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::warmup::task::{warmup_fn, WarmupPriority, WarmupTask};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service(warmup: WarmupConfig) -> Arc<CacheWarmupService> {
        let config = PortalCacheConfig::for_test();
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheService::new(Some(store), &config));
        Arc::new(CacheWarmupService::new(cache, warmup))
    }

    fn counting_task(counter: &Arc<AtomicUsize>) -> WarmupTask {
        let counter = Arc::clone(counter);
        WarmupTask::new(
            "high",
            WarmupPriority::High,
            warmup_fn(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
    }

    /// Let spawned loops and runs reach their next await point
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_loops_fire_on_their_cadence() {
        let service = service(WarmupConfig {
            full_interval_seconds: 3600,
            incremental_interval_seconds: 3600,
            high_priority_interval_seconds: 10,
            ..WarmupConfig::default()
        });
        let high_runs = Arc::new(AtomicUsize::new(0));
        service.register_task(counting_task(&high_runs));

        let schedule = service.schedule_warmup();
        assert_eq!(schedule.active_loops().len(), 3);

        // Nothing runs before the first period elapses
        tokio::time::advance(Duration::from_secs(9)).await;
        settle().await;
        assert_eq!(high_runs.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(high_runs.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(high_runs.load(Ordering::SeqCst), 2);

        schedule.shutdown();
        settle().await;
        assert!(!schedule.is_running());

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(high_runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped_not_fatal() {
        let service = service(WarmupConfig {
            full_interval_seconds: 3600,
            incremental_interval_seconds: 3600,
            high_priority_interval_seconds: 0,
            ..WarmupConfig::default()
        });
        let high_runs = Arc::new(AtomicUsize::new(0));
        service.register_task(counting_task(&high_runs));

        let schedule = service.schedule_warmup();
        settle().await;
        assert_eq!(
            schedule.active_loops(),
            vec!["full", "incremental", "high_priority"]
        );

        tokio::time::advance(MIN_PERIOD).await;
        settle().await;
        assert_eq!(high_runs.load(Ordering::SeqCst), 1);
        assert_eq!(schedule.active_loops().len(), 3);
    }
}
