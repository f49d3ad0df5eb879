//! In-memory asset caches

use crate::{
    stats::{CacheMetrics, CacheStats},
    traits::AssetCache,
};
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::{debug, trace};

/// Hash map backed cache holding every asset until it is removed
pub struct MemoryCache<V> {
    entries: HashMap<String, Arc<V>>,
    metrics: CacheMetrics,
}

impl<V> MemoryCache<V> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            metrics: CacheMetrics::new(),
        }
    }

    /// Create an empty cache with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            metrics: CacheMetrics::new(),
        }
    }

    /// Names of every cached entry, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for MemoryCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl<V> AssetCache<V> for MemoryCache<V> {
    fn lookup(&self, name: &str) -> Option<Arc<V>> {
        match self.entries.get(name) {
            Some(value) => {
                self.metrics.record_hit();
                trace!(name, "Cache hit");
                Some(Arc::clone(value))
            }
            None => {
                self.metrics.record_miss();
                trace!(name, "Cache miss");
                None
            }
        }
    }

    fn add(&mut self, name: String, value: Arc<V>) {
        self.metrics.record_insertion();
        self.entries.insert(name, value);
    }

    fn remove(&mut self, name: &str) -> bool {
        let removed = self.entries.remove(name).is_some();
        if removed {
            self.metrics.record_removals(1);
            debug!(name, "Removed cache entry");
        }
        removed
    }

    fn wipe(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        if prefix.is_empty() {
            self.entries.clear();
        } else {
            self.entries.retain(|name, _| !name.starts_with(prefix));
        }
        let removed = before - self.entries.len();
        self.metrics.record_removals(removed);
        debug!(prefix, removed, "Wiped cache entries");
        removed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.entries.len())
    }
}

/// Cache that stores nothing
///
/// Every lookup misses, so each request is parsed afresh. Suits single-pass
/// scans over many assets where residency would only cost memory.
#[derive(Debug, Default)]
pub struct NoCache {
    metrics: CacheMetrics,
}

impl NoCache {
    /// Create a pass-through cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V> AssetCache<V> for NoCache {
    fn lookup(&self, _name: &str) -> Option<Arc<V>> {
        self.metrics.record_miss();
        None
    }

    fn add(&mut self, _name: String, _value: Arc<V>) {}

    fn remove(&mut self, _name: &str) -> bool {
        false
    }

    fn wipe(&mut self, _prefix: &str) -> usize {
        0
    }

    fn len(&self) -> usize {
        0
    }

    fn stats(&self) -> CacheStats {
        self.metrics.snapshot(0)
    }
}
