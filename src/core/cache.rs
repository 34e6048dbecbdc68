//! LRU cache of decoded model grids.
//!
//! Decoding and gridding a model is expensive and the same model is often
//! assigned to many objects, so grids are cached behind their model key and
//! shared as [`SharedGrid`] handles. Mutating consumers (the painter, the
//! destruction engine) trigger copy-on-write, which keeps the cached entry
//! pristine.

use std::num::NonZeroUsize;
use std::sync::Arc;

use log::debug;
use lru::LruCache;

use crate::voxel::SharedGrid;

/// Process-wide (but explicitly owned) cache of model grids.
pub struct ModelCache {
    cache: LruCache<String, SharedGrid>,
}

impl ModelCache {
    /// Creates a cache holding up to `capacity` grids.
    pub fn new(capacity: NonZeroUsize) -> Self {
        ModelCache {
            cache: LruCache::new(capacity),
        }
    }

    /// Returns the cached grid for a model key, if present, refreshing its
    /// recency.
    pub fn get(&mut self, key: &str) -> Option<SharedGrid> {
        self.cache.get(key).map(Arc::clone)
    }

    /// Returns the cached grid for a model key, building and inserting it
    /// on a miss.
    pub fn get_or_insert_with(
        &mut self,
        key: &str,
        build: impl FnOnce() -> SharedGrid,
    ) -> SharedGrid {
        if let Some(grid) = self.cache.get(key) {
            return Arc::clone(grid);
        }
        debug!("model cache miss for {key}");
        let grid = build();
        self.cache.put(key.to_owned(), Arc::clone(&grid));
        grid
    }

    /// Number of cached grids.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns true if no grid is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        ModelCache::new(NonZeroUsize::new(32).expect("non-zero capacity"))
    }
}
