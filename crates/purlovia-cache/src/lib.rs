//! Asset caches for the purlovia loader
//!
//! Parsed assets are expensive to produce and heavily shared: following a
//! class hierarchy touches the same parent assets again and again. The
//! loader keeps every parsed asset in an [`AssetCache`], keyed by canonical
//! name, so each file is read and parsed at most once per run.
//!
//! # Implementations
//!
//! - [`MemoryCache`]: keeps everything until removed
//! - [`NoCache`]: keeps nothing
//!
//! # Invalidation
//!
//! There is no automatic eviction. Callers drop entries explicitly, either
//! one name at a time or by prefix. Wiping `/Game/Mods/<mod>/` after a mod
//! is reinstalled discards all of that mod's assets at once.
//!
//! ```rust
//! use purlovia_cache::{AssetCache, MemoryCache};
//! use std::sync::Arc;
//!
//! let mut cache = MemoryCache::new();
//! cache.add("/Game/Mods/Ebenus/Astrocetus".to_string(), Arc::new(1));
//! cache.add("/Game/PrimalEarth/Rex".to_string(), Arc::new(2));
//!
//! assert_eq!(cache.wipe("/Game/Mods/Ebenus/"), 1);
//! assert!(cache.lookup("/Game/PrimalEarth/Rex").is_some());
//! ```

#![warn(missing_docs)]

pub mod memory_cache;
pub mod stats;
pub mod traits;

pub use memory_cache::{MemoryCache, NoCache};
pub use stats::{CacheMetrics, CacheStats};
pub use traits::AssetCache;
