//! Crate-level error types
//!
//! Store and serialization failures are swallowed inside the cache services
//! (see [`crate::cache::safe`]); the variants here surface only from
//! configuration loading, bootstrap, and warmup task bookkeeping.

use crate::config::ConfigurationError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalCacheError {
    /// Key-value store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Cache envelope could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Warmup task exceeded its time budget
    #[error("Warmup task '{key}' timed out after {timeout_ms}ms")]
    WarmupTimeout { key: String, timeout_ms: u64 },

    /// Warmup task panicked or was aborted by the runtime
    #[error("Warmup task '{key}' aborted: {reason}")]
    WarmupAborted { key: String, reason: String },

    /// Warmup task producer returned an error
    #[error("Warmup task '{key}' failed: {source}")]
    WarmupFailed {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, PortalCacheError>;
