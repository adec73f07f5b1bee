//! Port definition for the decoded image cache.

use crate::domain::entities::{CacheKey, SharedImage};

/// Port for in-memory caching of decoded images.
///
/// Implementations must be thread-safe and may drop entries at any time, so
/// callers treat every `get` as possibly absent, even for keys they inserted.
pub trait ResourceCache: Send + Sync {
    /// Returns the cached image for `key`, if any. Never blocks on I/O.
    fn get(&self, key: &CacheKey) -> Option<SharedImage>;

    /// Like `get`, but neither refreshes recency nor counts as a lookup.
    fn peek(&self, key: &CacheKey) -> Option<SharedImage>;

    /// Stores an image, replacing any existing entry for `key`.
    fn put(&self, key: CacheKey, image: SharedImage);

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry, e.g. under memory pressure.
    fn clear(&self);
}
