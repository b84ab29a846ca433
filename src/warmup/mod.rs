//! # Cache Warmup
//!
//! Proactive cache population: producers are registered as [`WarmupTask`]s
//! with a priority and optional dependencies, and [`CacheWarmupService`]
//! runs them in dependency order with bounded concurrency and a per-task
//! timeout.
//!
//! ## Scheduling
//!
//! [`CacheWarmupService::schedule_warmup`] starts three loops (full,
//! incremental, high-priority) and returns a [`WarmupSchedule`] that stops
//! them on [`WarmupSchedule::shutdown`] or drop.

pub mod defaults;
pub mod ordering;
pub mod scheduler;
pub mod service;
pub mod stats;
pub mod task;

pub use defaults::{default_tasks, PortalDataSource};
pub use ordering::order_tasks;
pub use scheduler::WarmupSchedule;
pub use service::{CacheWarmupService, WarmupOptions};
pub use stats::WarmupStats;
pub use task::{warmup_fn, PriorityFilter, TaskSummary, WarmupFn, WarmupPriority, WarmupTask};
