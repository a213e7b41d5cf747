use crate::prelude::{Arc, Mutex};
use lru::LruCache;
use std::num::NonZeroUsize;

const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(crate::constants::DEFAULT_CACHE_SIZE) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// In-memory payload cache keyed by resource locator, using LRU eviction.
/// Clones share the same storage.
#[derive(Debug)]
pub struct TileCache {
    cache: Arc<Mutex<LruCache<String, Arc<Vec<u8>>>>>,
}

impl TileCache {
    /// Create a new tile cache with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(FALLBACK_CAPACITY);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Get a payload from the cache, marking it recently used
    pub fn get(&self, locator: &str) -> Option<Arc<Vec<u8>>> {
        self.cache.lock().ok()?.get(locator).cloned()
    }

    /// Insert a payload into the cache
    pub fn put(&self, locator: String, data: Arc<Vec<u8>>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(locator, data);
        }
    }

    /// Check if a payload is in the cache
    pub fn contains(&self, locator: &str) -> bool {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.contains(locator))
            .unwrap_or(false)
    }

    /// Clear all payloads from the cache
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Get the current number of cached payloads
    pub fn len(&self) -> usize {
        self.cache.lock().ok().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.cap().get())
            .unwrap_or(0)
    }
}

impl Clone for TileCache {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_CACHE_SIZE)
    }
}
