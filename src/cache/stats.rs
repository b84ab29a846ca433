//! Cache operation counters
//!
//! Lock-free atomics updated on the hot path, read through [`CacheStats`]
//! snapshots.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    /// Reserved; always 0
    pub size: u64,
    /// Bytes reported by the store's `used_memory`
    pub memory_usage: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, 0.0 before any read
    pub fn hit_ratio(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            0.0
        } else {
            self.hits as f64 / reads as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct AtomicCacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    memory_usage: AtomicU64,
}

impl AtomicCacheStats {
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_deletes(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn set_memory_usage(&self, bytes: u64) {
        self.memory_usage.store(bytes, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.memory_usage.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            size: 0,
            memory_usage: self.memory_usage.load(Ordering::Relaxed),
        }
    }
}

/// Extract `used_memory:<bytes>` from an `INFO memory` reply
pub(crate) fn parse_used_memory(info: &str) -> Option<u64> {
    info.lines().find_map(|line| {
        line.trim()
            .strip_prefix("used_memory:")
            .and_then(|bytes| bytes.trim().parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let stats = AtomicCacheStats::default();
        stats.record_hit();
        stats.record_miss();
        stats.record_miss();
        stats.record_set();
        stats.record_deletes(3);
        stats.set_memory_usage(2048);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 2);
        assert_eq!(snapshot.sets, 1);
        assert_eq!(snapshot.deletes, 3);
        assert_eq!(snapshot.memory_usage, 2048);
        assert!((snapshot.hit_ratio() - 1.0 / 3.0).abs() < f64::EPSILON);

        stats.reset();
        assert_eq!(stats.snapshot(), CacheStats::default());
    }

    #[test]
    fn test_parse_used_memory() {
        let info = "# Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\n";
        assert_eq!(parse_used_memory(info), Some(1_048_576));
        assert_eq!(parse_used_memory("# Memory\r\n"), None);
    }
}
