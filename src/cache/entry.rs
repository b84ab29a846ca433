//! Stored envelope and per-write options

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Envelope written to the store for every cached value
///
/// Serialized as JSON with camelCase keys. `expires_at` duplicates the store's
/// native TTL so a value that outlived its deadline is still treated as a miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    /// Unix epoch milliseconds
    pub created_at: i64,
    /// Unix epoch milliseconds
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed: Option<bool>,
}

impl<T> CacheEntry<T> {
    /// Build an envelope that expires `ttl_seconds` after `now_ms`
    pub fn new(data: T, now_ms: i64, ttl_seconds: u64, config: &CacheConfig) -> Self {
        let ttl_ms = i64::try_from(ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        Self {
            data,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
            tags: (!config.tags.is_empty()).then(|| config.tags.clone()),
            version: config.version.clone(),
            compressed: config.compress,
        }
    }

    /// Stale once `now_ms` passes `expires_at`
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }
}

/// Serialize an envelope for the store
///
/// The compressed path shares the plain JSON encoding; the flag is only
/// recorded in the envelope.
pub fn encode<T: Serialize>(entry: &CacheEntry<T>) -> serde_json::Result<String> {
    serde_json::to_string(entry)
}

/// Parse a stored envelope
pub fn decode<T: DeserializeOwned>(raw: &str) -> serde_json::Result<CacheEntry<T>> {
    serde_json::from_str(raw)
}

/// Write strategy hint, accepted but not acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStrategy {
    CacheAside,
    WriteThrough,
    WriteBehind,
}

/// Per-write options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds; falls back to the service default
    pub ttl: Option<u64>,
    pub tags: Vec<String>,
    pub strategy: Option<CacheStrategy>,
    pub compress: Option<bool>,
    pub version: Option<String>,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl_seconds: u64) -> Self {
        Self {
            ttl: Some(ttl_seconds),
            ..Self::default()
        }
    }

    pub fn ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl = Some(ttl_seconds);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn strategy(mut self, strategy: CacheStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Copy of these options with `leading` tags placed first and `default_ttl`
    /// used when no TTL was given
    pub(crate) fn layered(&self, leading: &[&str], default_ttl: u64) -> Self {
        let mut tags: Vec<String> = leading.iter().map(|t| (*t).to_string()).collect();
        tags.extend(self.tags.iter().cloned());
        Self {
            ttl: Some(self.ttl.unwrap_or(default_ttl)),
            tags,
            ..self.clone()
        }
    }

    /// Copy of these options with `default_tags` used only when the caller
    /// gave none, and `default_ttl` used when no TTL was given
    pub(crate) fn defaulted(&self, default_tags: &[&str], default_ttl: u64) -> Self {
        let tags = if self.tags.is_empty() {
            default_tags.iter().map(|t| (*t).to_string()).collect()
        } else {
            self.tags.clone()
        };
        Self {
            ttl: Some(self.ttl.unwrap_or(default_ttl)),
            tags,
            ..self.clone()
        }
    }
}
