//! Warmup task definitions

use crate::constants::ttl;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Zero-argument async producer that populates the cache
///
/// Shared between the warmup registry and the cache service, so it is
/// reference counted and callable any number of times.
pub type WarmupFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wrap an async closure as a [`WarmupFn`]
///
/// ```rust
/// use portal_cache::warmup::warmup_fn;
///
/// let task = warmup_fn(|| async { Ok(()) });
/// let _future = task();
/// ```
pub fn warmup_fn<F, Fut>(producer: F) -> WarmupFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || producer().boxed())
}

/// Task priority; higher runs earlier among tasks that are ready together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupPriority {
    Low,
    Medium,
    High,
}

impl WarmupPriority {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for WarmupPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tasks a warmup run selects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl PriorityFilter {
    pub fn matches(&self, priority: WarmupPriority) -> bool {
        match self {
            Self::All => true,
            Self::High => priority == WarmupPriority::High,
            Self::Medium => priority == WarmupPriority::Medium,
            Self::Low => priority == WarmupPriority::Low,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl From<WarmupPriority> for PriorityFilter {
    fn from(priority: WarmupPriority) -> Self {
        match priority {
            WarmupPriority::High => Self::High,
            WarmupPriority::Medium => Self::Medium,
            WarmupPriority::Low => Self::Low,
        }
    }
}

/// A registered warmup producer with its scheduling metadata
#[derive(Clone)]
pub struct WarmupTask {
    pub key: String,
    pub priority: WarmupPriority,
    /// Seconds; descriptive, the producer decides what it writes
    pub ttl: u64,
    pub tags: Vec<String>,
    pub task: WarmupFn,
    /// Keys of tasks that must be scheduled before this one
    pub dependencies: Vec<String>,
}

impl WarmupTask {
    pub fn new(key: impl Into<String>, priority: WarmupPriority, task: WarmupFn) -> Self {
        Self {
            key: key.into(),
            priority,
            ttl: ttl::CACHE,
            tags: Vec::new(),
            task,
            dependencies: Vec::new(),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl = ttl_seconds;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            key: self.key.clone(),
            priority: self.priority,
            tags: self.tags.clone(),
        }
    }
}

impl fmt::Debug for WarmupTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarmupTask")
            .field("key", &self.key)
            .field("priority", &self.priority)
            .field("ttl", &self.ttl)
            .field("tags", &self.tags)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Registry listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub key: String,
    pub priority: WarmupPriority,
    pub tags: Vec<String>,
}
