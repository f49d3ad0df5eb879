//! Cache statistics
//!
//! Counters are atomic so read-only lookups can record hits and misses
//! through a shared reference.

#![allow(clippy::cast_precision_loss)] // Rates are approximate by nature

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time statistics for a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries added, including overwrites
    pub insertions: u64,
    /// Entries removed by `remove` or `wipe`
    pub removals: u64,
    /// Entries currently held
    pub entries: usize,
}

impl CacheStats {
    /// Total number of lookups
    pub fn lookups(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    /// Fraction of lookups that hit, zero before the first lookup
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

/// Atomic counters behind [`CacheStats`]
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    removals: AtomicU64,
}

impl CacheMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a lookup that found an entry
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a lookup that found nothing
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an added entry
    #[inline]
    pub fn record_insertion(&self) {
        self.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Count removed entries
    #[inline]
    pub fn record_removals(&self, count: usize) {
        self.removals.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Snapshot the counters alongside the current entry count
    pub fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            entries,
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.insertions.store(0, Ordering::Relaxed);
        self.removals.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.snapshot(0).hit_rate(), 0.0);

        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        let stats = metrics.snapshot(2);
        assert_eq!(stats.lookups(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.entries, 2);

        metrics.reset();
        assert_eq!(metrics.snapshot(0), CacheStats::default());
    }
}
