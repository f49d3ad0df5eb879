//! Cache capability shared by every implementation

use crate::stats::CacheStats;
use std::sync::Arc;

/// Name-keyed store of parsed assets
///
/// Keys are canonical asset names such as `/Game/PrimalEarth/Dinos/Rex/Rex_Character_BP`.
/// Values are shared behind [`Arc`]: the cache owns them and callers borrow
/// clones of the handle, never copies of the asset.
///
/// Entries are never evicted automatically. They live until [`remove`] or
/// [`wipe`] drops them.
///
/// [`remove`]: AssetCache::remove
/// [`wipe`]: AssetCache::wipe
pub trait AssetCache<V> {
    /// Entry for `name`, if cached
    fn lookup(&self, name: &str) -> Option<Arc<V>>;

    /// Store `value` under `name`, replacing any existing entry
    fn add(&mut self, name: String, value: Arc<V>);

    /// Drop the entry for `name`. Returns true if one was present.
    fn remove(&mut self, name: &str) -> bool;

    /// Drop every entry whose name starts with `prefix` and return how many
    /// were removed. An empty prefix clears the cache.
    fn wipe(&mut self, prefix: &str) -> usize;

    /// Number of cached entries
    fn len(&self) -> usize;

    /// True when nothing is cached
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters since the cache was created
    fn stats(&self) -> CacheStats;
}
