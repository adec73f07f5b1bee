//! In-memory LRU image cache implementation.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{CacheKey, SharedImage};
use crate::domain::ports::ResourceCache;

/// Default maximum number of images to cache in memory.
pub const DEFAULT_CACHE_SIZE: usize = 50;

/// In-memory LRU cache for decoded images.
/// Thread-safe; lookups never wait on I/O.
pub struct MemoryImageCache {
    cache: Mutex<LruCache<CacheKey, SharedImage>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default capacity.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }

    /// Returns the maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

impl ResourceCache for MemoryImageCache {
    fn get(&self, key: &CacheKey) -> Option<SharedImage> {
        let mut cache = self.cache.lock();
        if let Some(img) = cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            None
        }
    }

    fn peek(&self, key: &CacheKey) -> Option<SharedImage> {
        self.cache.lock().peek(key).cloned()
    }

    fn put(&self, key: CacheKey, image: SharedImage) {
        let mut cache = self.cache.lock();
        debug!(key = %key, "Storing image in memory cache");
        if let Some((evicted, _)) = cache.push(key.clone(), image)
            && evicted != key
        {
            trace!(key = %evicted, "Evicted least recently used image");
        }
    }

    fn len(&self) -> usize {
        self.cache.lock().len()
    }

    fn clear(&self) {
        self.cache.lock().clear();
        debug!("Cleared memory image cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn img(w: u32) -> SharedImage {
        Arc::new(image::DynamicImage::new_rgb8(w, w))
    }

    #[test]
    fn test_cache_put_and_get() {
        let cache = MemoryImageCache::new(10);
        let key = CacheKey::new("https://example.test/a.png");
        let stored = img(100);

        cache.put(key.clone(), stored.clone());
        let retrieved = cache.get(&key).unwrap();

        assert!(Arc::ptr_eq(&retrieved, &stored));
        assert_eq!(retrieved.width(), 100);
    }

    #[test]
    fn test_cache_miss() {
        let cache = MemoryImageCache::new(10);
        assert!(cache.get(&CacheKey::new("nonexistent")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_overwrites_existing_entry() {
        let cache = MemoryImageCache::new(10);
        let key = CacheKey::new("k");
        let first = img(1);
        let second = img(2);

        cache.put(key.clone(), first);
        cache.put(key.clone(), second.clone());

        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &second));
    }

    #[test]
    fn test_cache_eviction() {
        let cache = MemoryImageCache::new(2);
        let k1 = CacheKey::new("test1");
        let k2 = CacheKey::new("test2");
        let k3 = CacheKey::new("test3");

        cache.put(k1.clone(), img(10));
        cache.put(k2.clone(), img(10));
        cache.put(k3.clone(), img(10));

        // k1 should be evicted (LRU)
        assert!(cache.get(&k1).is_none());
        assert!(cache.get(&k2).is_some());
        assert!(cache.get(&k3).is_some());
    }

    #[test]
    fn test_cache_stats() {
        let cache = MemoryImageCache::new(10);
        let key = CacheKey::new("test1");
        cache.put(key.clone(), img(10));

        let _ = cache.get(&key);
        let _ = cache.get(&CacheKey::new("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!(stats.to_string().contains("50.0% hit rate"));
    }

    #[test]
    fn test_peek_does_not_promote() {
        let cache = MemoryImageCache::new(2);
        let k1 = CacheKey::new("test1");
        let k2 = CacheKey::new("test2");

        cache.put(k1.clone(), img(10));
        cache.put(k2.clone(), img(10));

        let _ = cache.peek(&k1);

        cache.put(CacheKey::new("test3"), img(10));

        assert!(cache.peek(&k1).is_none());
        assert!(cache.peek(&k2).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = MemoryImageCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = MemoryImageCache::new(4);
        cache.put(CacheKey::new("a"), img(1));
        cache.put(CacheKey::new("b"), img(1));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_puts_do_not_corrupt() {
        let cache = Arc::new(MemoryImageCache::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let key = CacheKey::new(format!("{t}-{i}"));
                        cache.put(key.clone(), img(1));
                        assert!(cache.get(&key).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 400);
    }
}
