//! Configuration Loader
//!
//! Layered loading through the `config` crate: a configuration file (format
//! chosen by extension) overlaid by `PORTAL_CACHE__*` environment variables.
//! Fields absent from both layers keep their [`PortalCacheConfig::default`]
//! values.

use super::error::{ConfigResult, ConfigurationError};
use super::PortalCacheConfig;
use std::path::Path;
use tracing::debug;

/// Prefix for layered environment variables (`PORTAL_CACHE__WARMUP__MAX_CONCURRENT`)
pub const ENV_PREFIX: &str = "PORTAL_CACHE";

/// Separator between nested keys in layered environment variables
pub const ENV_SEPARATOR: &str = "__";

/// Loads [`PortalCacheConfig`] from files and the environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from `path`
    pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<PortalCacheConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigurationError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let file_path = path.display().to_string();
        debug!(path = %file_path, "Loading cache configuration file");

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(&file_path, e))?;

        let config: PortalCacheConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::load_error(&file_path, e))?;

        config.validate()?;

        debug!(
            path = %file_path,
            backend = %config.backend,
            enabled = config.enabled,
            "Cache configuration loaded"
        );

        Ok(config)
    }
}
