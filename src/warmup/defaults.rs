//! Standard warmup tasks for the portal
//!
//! The application supplies the data through [`PortalDataSource`]; each task
//! fetches one dataset and writes it through `static_cache` or
//! `dynamic_cache`. A fetch error fails the task.

use super::task::{warmup_fn, WarmupFn, WarmupPriority, WarmupTask};
use crate::cache::{CacheConfig, CacheService};
use crate::constants::{keys, tags, ttl};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::Arc;

/// Datasets the default warmup tasks pre-load
#[async_trait]
pub trait PortalDataSource: Send + Sync {
    /// Active roles, first page of 100 sorted by name
    async fn active_roles(&self) -> anyhow::Result<Value>;

    /// Users seen in the last 30 days
    async fn active_users(&self) -> anyhow::Result<Value>;

    async fn popular_courses(&self) -> anyhow::Result<Value>;

    async fn popular_books(&self) -> anyhow::Result<Value>;

    async fn system_config(&self) -> anyhow::Result<Value>;

    /// Headline counts for the dashboard
    async fn dashboard_stats(&self) -> anyhow::Result<Value>;
}

/// Filters behind [`PortalDataSource::active_roles`], also used in its cache key
pub fn active_role_filters() -> Value {
    json!({
        "active": true,
        "page": 1,
        "limit": 100,
        "sortBy": "name",
        "sortOrder": "asc",
    })
}

type Fetch = for<'a> fn(&'a dyn PortalDataSource) -> BoxFuture<'a, anyhow::Result<Value>>;

#[derive(Debug, Clone, Copy)]
enum Retention {
    Static,
    Dynamic,
}

impl Retention {
    fn tag(self) -> &'static str {
        match self {
            Self::Static => tags::STATIC,
            Self::Dynamic => tags::DYNAMIC,
        }
    }
}

fn fetch_and_cache(
    cache: &Arc<CacheService>,
    source: &Arc<dyn PortalDataSource>,
    key: String,
    tag: &'static str,
    retention: Retention,
    fetch: Fetch,
) -> WarmupFn {
    let cache = Arc::clone(cache);
    let source = Arc::clone(source);
    warmup_fn(move || {
        let cache = Arc::clone(&cache);
        let source = Arc::clone(&source);
        let key = key.clone();
        async move {
            let data = fetch(source.as_ref()).await?;
            let config = CacheConfig::new().tags([tag, retention.tag()]);
            match retention {
                Retention::Static => cache.static_cache(&key, &data, &config).await,
                Retention::Dynamic => cache.dynamic_cache(&key, &data, &config).await,
            }
            Ok::<(), anyhow::Error>(())
        }
    })
}

/// Build the default task set in registration order
///
/// | key | priority | depends on |
/// |---|---|---|
/// | `roles_active` | high | |
/// | `users_active` | medium | `roles_active` |
/// | `courses_popular` | medium | |
/// | `system_config` | high | |
/// | `dashboard_stats` | low | |
/// | `books_popular` | medium | |
pub fn default_tasks(
    cache: &Arc<CacheService>,
    source: Arc<dyn PortalDataSource>,
) -> Vec<WarmupTask> {
    let roles_key = keys::role_list(&active_role_filters().to_string());

    vec![
        WarmupTask::new(
            "roles_active",
            WarmupPriority::High,
            fetch_and_cache(cache, &source, roles_key, "roles", Retention::Static, |s| {
                s.active_roles()
            }),
        )
        .with_ttl(ttl::LONG)
        .with_tags(["roles", "static"]),
        WarmupTask::new(
            "users_active",
            WarmupPriority::Medium,
            fetch_and_cache(
                cache,
                &source,
                keys::USERS_ACTIVE_RECENT.to_string(),
                "users",
                Retention::Dynamic,
                |s| s.active_users(),
            ),
        )
        .with_ttl(ttl::MEDIUM)
        .with_tags(["users", "dynamic"])
        .depends_on(["roles_active"]),
        WarmupTask::new(
            "courses_popular",
            WarmupPriority::Medium,
            fetch_and_cache(
                cache,
                &source,
                keys::COURSES_POPULAR.to_string(),
                "courses",
                Retention::Static,
                |s| s.popular_courses(),
            ),
        )
        .with_ttl(ttl::LONG)
        .with_tags(["courses", "static"]),
        WarmupTask::new(
            "system_config",
            WarmupPriority::High,
            fetch_and_cache(
                cache,
                &source,
                keys::STATIC_CONFIG.to_string(),
                "config",
                Retention::Static,
                |s| s.system_config(),
            ),
        )
        .with_ttl(ttl::STATIC)
        .with_tags(["config", "static"]),
        WarmupTask::new(
            "dashboard_stats",
            WarmupPriority::Low,
            fetch_and_cache(
                cache,
                &source,
                keys::DASHBOARD_STATS.to_string(),
                "stats",
                Retention::Dynamic,
                |s| s.dashboard_stats(),
            ),
        )
        .with_ttl(ttl::SHORT)
        .with_tags(["stats", "dynamic"]),
        WarmupTask::new(
            "books_popular",
            WarmupPriority::Medium,
            fetch_and_cache(
                cache,
                &source,
                keys::BOOKS_POPULAR.to_string(),
                "books",
                Retention::Static,
                |s| s.popular_books(),
            ),
        )
        .with_ttl(ttl::LONG)
        .with_tags(["books", "static"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalCacheConfig;
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::warmup::ordering::order_tasks;

    struct FixedSource;

    #[async_trait]
    impl PortalDataSource for FixedSource {
        async fn active_roles(&self) -> anyhow::Result<Value> {
            Ok(json!([{"id": 1, "name": "admin"}]))
        }
        async fn active_users(&self) -> anyhow::Result<Value> {
            Ok(json!([{"id": 10}]))
        }
        async fn popular_courses(&self) -> anyhow::Result<Value> {
            Ok(json!([]))
        }
        async fn popular_books(&self) -> anyhow::Result<Value> {
            anyhow::bail!("books table locked")
        }
        async fn system_config(&self) -> anyhow::Result<Value> {
            Ok(json!({"features": {"cache": true}}))
        }
        async fn dashboard_stats(&self) -> anyhow::Result<Value> {
            Ok(json!({"total_users": 3}))
        }
    }

    fn cache() -> (Arc<CacheService>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheService::new(
            Some(store.clone() as Arc<dyn KeyValueStore>),
            &PortalCacheConfig::for_test(),
        ));
        (cache, store)
    }

    #[test]
    fn test_default_task_table() {
        let (cache, _) = cache();
        let tasks = default_tasks(&cache, Arc::new(FixedSource));
        let keys: Vec<&str> = tasks.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "roles_active",
                "users_active",
                "courses_popular",
                "system_config",
                "dashboard_stats",
                "books_popular"
            ]
        );
        assert_eq!(tasks[1].dependencies, vec!["roles_active".to_string()]);
        assert_eq!(tasks[3].ttl, 604_800);

        let ordered: Vec<String> = order_tasks(&tasks).into_iter().map(|t| t.key).collect();
        assert_eq!(
            ordered,
            vec![
                "roles_active",
                "system_config",
                "courses_popular",
                "books_popular",
                "dashboard_stats",
                "users_active"
            ]
        );
    }

    #[tokio::test]
    async fn test_tasks_write_through_cache() {
        let (cache, store) = cache();
        let tasks = default_tasks(&cache, Arc::new(FixedSource));

        for task in &tasks[..5] {
            (task.task)().await.unwrap();
        }
        assert!((tasks[5].task)().await.is_err());

        let config: Option<Value> = cache.get(keys::STATIC_CONFIG).await;
        assert_eq!(config, Some(json!({"features": {"cache": true}})));

        let roles_key = keys::role_list(&active_role_filters().to_string());
        assert!(cache.get::<Value>(&roles_key).await.is_some());

        let dashboard_ttl = store.ttl("portal_cache:dashboard:stats").await.unwrap();
        assert!(dashboard_ttl > 0 && dashboard_ttl <= 300);
        assert!(store.get("portal_cache:books:popular").await.unwrap().is_none());
    }
}
