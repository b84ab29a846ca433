//! # Portal Cache Configuration
//!
//! Environment-aware configuration for the cache service, its store
//! connection, and the warmup scheduler.
//!
//! ## Sources
//!
//! - **Profiles**: [`PortalCacheConfig::default`] (production),
//!   [`PortalCacheConfig::for_development`], [`PortalCacheConfig::for_test`]
//! - **Environment overrides**: `REDIS_ENABLED`, `CACHE_PREFIX`, `REDIS_URL`,
//!   `REDIS_HOST`, `REDIS_PORT`, `REDIS_DB`, `REDIS_PASSWORD`,
//!   `PORTAL_CACHE_BACKEND`, `PORTAL_CACHE_DEFAULT_TTL_SECONDS`
//! - **Files**: [`ConfigLoader`] layers a TOML/YAML/JSON file and
//!   `PORTAL_CACHE__*` variables through the `config` crate
//!
//! ## Usage
//!
//! ```rust
//! use portal_cache::config::PortalCacheConfig;
//!
//! let config = PortalCacheConfig::for_test();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.key_prefix, "portal_cache:");
//! ```

pub mod error;
pub mod loader;

use crate::constants::{self, ttl};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Root configuration for the cache subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalCacheConfig {
    /// Master switch; a disabled cache turns every operation into a no-op
    pub enabled: bool,

    /// Store backend: `redis` (alias `dragonfly`) or `memory`
    pub backend: String,

    /// Prefix applied to every key the cache touches
    pub key_prefix: String,

    /// TTL used when a write does not specify one
    pub default_ttl_seconds: u64,

    /// How often `memory_usage` is refreshed from the store
    pub stats_refresh_interval_seconds: u64,

    /// Ping latency below which the store is reported healthy
    pub healthy_latency_threshold_ms: u64,

    /// Store connection settings
    pub redis: RedisConfig,

    /// Warmup runner and scheduler settings
    pub warmup: WarmupConfig,
}

/// Redis connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Full connection URL; takes precedence over host/port/database
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: u32,
    pub password: Option<String>,
    pub connection_timeout_seconds: u64,
}

/// Warmup runner and scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Batch size for a warmup run
    pub max_concurrent: usize,

    /// Per-task time budget
    pub task_timeout_ms: u64,

    /// Full warmup cadence
    pub full_interval_seconds: u64,

    /// Incremental warmup cadence
    pub incremental_interval_seconds: u64,

    /// High-priority warmup cadence
    pub high_priority_interval_seconds: u64,

    /// How many keys incremental warmup inspects
    pub incremental_scan_limit: usize,

    /// Remaining TTL under which a key counts as about to expire
    pub expiring_threshold_seconds: i64,

    /// Batch size of the high-priority pass triggered by incremental warmup
    pub incremental_max_concurrent: usize,
}

impl Default for PortalCacheConfig {
    /// Default configuration suitable for production
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "redis".to_string(),
            key_prefix: constants::DEFAULT_KEY_PREFIX.to_string(),
            default_ttl_seconds: ttl::CACHE,
            stats_refresh_interval_seconds: 60,
            healthy_latency_threshold_ms: constants::HEALTHY_LATENCY_THRESHOLD_MS,
            redis: RedisConfig::default(),
            warmup: WarmupConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 6379,
            database: 0,
            password: None,
            connection_timeout_seconds: 10,
        }
    }
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            task_timeout_ms: 30_000,
            full_interval_seconds: 6 * 60 * 60,
            incremental_interval_seconds: 30 * 60,
            high_priority_interval_seconds: 60 * 60,
            incremental_scan_limit: 100,
            expiring_threshold_seconds: 5 * 60,
            incremental_max_concurrent: 3,
        }
    }
}

impl RedisConfig {
    /// Connection URL, built from the discrete fields when `url` is unset
    pub fn redis_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.database
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

impl WarmupConfig {
    /// Per-task time budget as Duration
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }
}

impl PortalCacheConfig {
    /// Test profile: in-memory store, short timeouts and cadences
    pub fn for_test() -> Self {
        Self {
            backend: "memory".to_string(),
            stats_refresh_interval_seconds: 1,
            redis: RedisConfig {
                connection_timeout_seconds: 1,
                ..RedisConfig::default()
            },
            warmup: WarmupConfig {
                task_timeout_ms: 1_000,
                full_interval_seconds: 60,
                incremental_interval_seconds: 30,
                high_priority_interval_seconds: 15,
                ..WarmupConfig::default()
            },
            ..Self::default()
        }
    }

    /// Development profile: Redis, shorter default TTL and cadences
    pub fn for_development() -> Self {
        Self {
            default_ttl_seconds: ttl::SHORT_CACHE,
            stats_refresh_interval_seconds: 30,
            warmup: WarmupConfig {
                full_interval_seconds: 60 * 60,
                incremental_interval_seconds: 10 * 60,
                high_priority_interval_seconds: 15 * 60,
                ..WarmupConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load the profile for the detected environment, then apply overrides
    pub fn from_environment() -> Self {
        let environment = detect_environment();

        let config = match environment.as_str() {
            "test" => {
                info!("Loading test cache configuration");
                Self::for_test()
            }
            "development" => {
                info!("Loading development cache configuration");
                Self::for_development()
            }
            _ => {
                info!("Loading production cache configuration");
                Self::default()
            }
        };

        config.with_env_overrides()
    }

    /// Apply overrides from process environment variables
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(enabled) = lookup("REDIS_ENABLED") {
            // Anything but an explicit "false" keeps the cache on
            self.enabled = enabled.trim() != "false";
            info!("Cache enabled override: {}", self.enabled);
        }

        if let Some(prefix) = lookup("CACHE_PREFIX") {
            if !prefix.is_empty() {
                self.key_prefix = prefix;
            }
        }

        if let Some(backend) = lookup("PORTAL_CACHE_BACKEND") {
            self.backend = backend;
        }

        if let Some(url) = lookup("REDIS_URL") {
            self.redis.url = Some(url);
        }

        if let Some(host) = lookup("REDIS_HOST") {
            self.redis.host = host;
        }

        if let Some(port) = lookup("REDIS_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.redis.port = port,
                Err(_) => warn!(value = %port, "Ignoring unparseable REDIS_PORT"),
            }
        }

        if let Some(db) = lookup("REDIS_DB") {
            match db.parse::<u32>() {
                Ok(db) => self.redis.database = db,
                Err(_) => warn!(value = %db, "Ignoring unparseable REDIS_DB"),
            }
        }

        if let Some(password) = lookup("REDIS_PASSWORD") {
            if !password.is_empty() {
                self.redis.password = Some(password);
            }
        }

        if let Some(ttl) = lookup("PORTAL_CACHE_DEFAULT_TTL_SECONDS") {
            match ttl.parse::<u64>() {
                Ok(seconds) => {
                    self.default_ttl_seconds = seconds;
                    info!("Default cache TTL override: {}s", seconds);
                }
                Err(_) => warn!(value = %ttl, "Ignoring unparseable PORTAL_CACHE_DEFAULT_TTL_SECONDS"),
            }
        }

        self
    }

    /// Default TTL as Duration
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// Stats refresh cadence as Duration
    pub fn stats_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.stats_refresh_interval_seconds)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.key_prefix.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "key_prefix",
                "",
                "Key prefix must not be empty",
            ));
        }

        if self.default_ttl_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "default_ttl_seconds",
                0,
                "Default TTL must be greater than 0",
            ));
        }

        if self.stats_refresh_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "stats_refresh_interval_seconds",
                0,
                "Stats refresh interval must be greater than 0",
            ));
        }

        if self.warmup.max_concurrent == 0 || self.warmup.incremental_max_concurrent == 0 {
            return Err(ConfigurationError::invalid_value(
                "warmup.max_concurrent",
                self.warmup.max_concurrent.min(self.warmup.incremental_max_concurrent),
                "Warmup batch sizes must be greater than 0",
            ));
        }

        if self.warmup.task_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "warmup.task_timeout_ms",
                0,
                "Warmup task timeout must be greater than 0",
            ));
        }

        for (field, value) in [
            ("warmup.full_interval_seconds", self.warmup.full_interval_seconds),
            (
                "warmup.incremental_interval_seconds",
                self.warmup.incremental_interval_seconds,
            ),
            (
                "warmup.high_priority_interval_seconds",
                self.warmup.high_priority_interval_seconds,
            ),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    0,
                    "Warmup intervals must be greater than 0",
                ));
            }
        }

        if self.backend == "redis" && self.redis.connection_timeout_seconds == 0 {
            warn!("Redis connection timeout is 0 - connection attempts will fail immediately");
        }

        Ok(())
    }

    /// Log current configuration for debugging
    pub fn log_configuration(&self) {
        info!("Portal Cache Configuration:");
        info!("  Enabled: {}", self.enabled);
        info!("  Backend: {}", self.backend);
        info!("  Key Prefix: {}", self.key_prefix);
        info!("  Default TTL: {}s", self.default_ttl_seconds);
        if self.backend == "redis" || self.backend == "dragonfly" {
            #[cfg(feature = "cache-redis")]
            info!(
                "  Redis: {}",
                crate::store::providers::redis::redact_url(&self.redis.redis_url())
            );
            #[cfg(not(feature = "cache-redis"))]
            info!("  Redis: {}:{}", self.redis.host, self.redis.port);
        }
        info!(
            "  Warmup: batch {}, timeout {}ms, full every {}s, incremental every {}s, high every {}s",
            self.warmup.max_concurrent,
            self.warmup.task_timeout_ms,
            self.warmup.full_interval_seconds,
            self.warmup.incremental_interval_seconds,
            self.warmup.high_priority_interval_seconds
        );
    }
}

/// Detect the runtime environment from common environment variables
pub fn detect_environment() -> String {
    env::var("PORTAL_CACHE_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .or_else(|_| env::var("NODE_ENV"))
        .unwrap_or_else(|_| "production".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_production_defaults() {
        let config = PortalCacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.backend, "redis");
        assert_eq!(config.key_prefix, "portal_cache:");
        assert_eq!(config.default_ttl_seconds, 3600);
        assert_eq!(config.warmup.max_concurrent, 5);
        assert_eq!(config.warmup.task_timeout(), Duration::from_secs(30));
        assert_eq!(config.warmup.full_interval_seconds, 21_600);
        assert_eq!(config.warmup.incremental_interval_seconds, 1_800);
        assert_eq!(config.warmup.high_priority_interval_seconds, 3_600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_profiles_validate() {
        assert!(PortalCacheConfig::for_test().validate().is_ok());
        assert!(PortalCacheConfig::for_development().validate().is_ok());
        assert_eq!(PortalCacheConfig::for_test().backend, "memory");
    }

    #[test]
    fn test_enabled_override_only_disables_on_false() {
        let off = PortalCacheConfig::default()
            .with_overrides_from(lookup_from(&[("REDIS_ENABLED", "false")]));
        assert!(!off.enabled);

        let on = PortalCacheConfig::default()
            .with_overrides_from(lookup_from(&[("REDIS_ENABLED", "0")]));
        assert!(on.enabled);
    }

    #[test]
    fn test_connection_overrides() {
        let config = PortalCacheConfig::default().with_overrides_from(lookup_from(&[
            ("CACHE_PREFIX", "tenant_a:"),
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("REDIS_DB", "3"),
            ("REDIS_PASSWORD", "hunter2"),
        ]));

        assert_eq!(config.key_prefix, "tenant_a:");
        assert_eq!(
            config.redis.redis_url(),
            "redis://:hunter2@cache.internal:6380/3"
        );
    }

    #[test]
    fn test_unparseable_numbers_are_ignored() {
        let config = PortalCacheConfig::default().with_overrides_from(lookup_from(&[
            ("REDIS_PORT", "not-a-port"),
            ("PORTAL_CACHE_DEFAULT_TTL_SECONDS", "soon"),
        ]));
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.default_ttl_seconds, 3600);
    }

    #[test]
    fn test_explicit_url_wins() {
        let config = PortalCacheConfig::default().with_overrides_from(lookup_from(&[
            ("REDIS_URL", "redis://elsewhere:7000/1"),
            ("REDIS_HOST", "ignored"),
        ]));
        assert_eq!(config.redis.redis_url(), "redis://elsewhere:7000/1");
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = PortalCacheConfig::default();
        config.warmup.max_concurrent = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));

        let config = PortalCacheConfig {
            key_prefix: String::new(),
            ..PortalCacheConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = PortalCacheConfig::default();
        config.warmup.incremental_interval_seconds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("incremental_interval_seconds"));
    }
}
