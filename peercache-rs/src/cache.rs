//! Provides a thread safe wrapper around an [LRUCache](crate::lru::LRUCache).
//!
//! Each [Group](crate::group::Group) owns exactly one [SyncCache]. The underlying LRU cache is
//! only created once the first value is stored, so that a group which is entirely served by its
//! peers never allocates any local storage.
//!
//! The lock is only held while the in-memory map is accessed or modified. Loading values (either
//! from a peer or the origin) always happens outside of it.
use parking_lot::Mutex;

use crate::byteview::ByteView;
use crate::lru::LRUCache;

/// Wraps a lazily created LRU cache of [ByteView]s into a mutex.
///
/// # Examples
/// ```
/// # use peercache::cache::SyncCache;
/// # use peercache::byteview::ByteView;
/// let cache = SyncCache::new(1024);
/// assert_eq!(cache.get("Tom"), None);
/// assert_eq!(cache.is_allocated(), false);
///
/// cache.add("Tom", ByteView::from("630")).unwrap();
/// assert_eq!(cache.get("Tom").unwrap().to_string(), "630");
/// ```
pub struct SyncCache {
    cache_bytes: usize,
    lru: Mutex<Option<LRUCache<ByteView>>>,
}

impl SyncCache {
    /// Creates a new cache which will hold up to **cache_bytes** of keys and values.
    pub fn new(cache_bytes: usize) -> Self {
        SyncCache {
            cache_bytes,
            lru: Mutex::new(None),
        }
    }

    /// Performs a lookup for the given key.
    ///
    /// If nothing has been stored yet, this returns **None** without creating the LRU cache.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.lru.lock().as_mut()?.get(key).cloned()
    }

    /// Stores the given value, creating the underlying LRU cache if required.
    ///
    /// # Errors
    /// Fails if the entry is larger than the whole cache (see [LRUCache::put]).
    pub fn add(&self, key: &str, value: ByteView) -> anyhow::Result<()> {
        self.lru
            .lock()
            .get_or_insert_with(|| LRUCache::new(self.cache_bytes))
            .put(key.to_owned(), value)
    }

    /// Returns the number of entries currently cached.
    pub fn len(&self) -> usize {
        self.lru.lock().as_ref().map(LRUCache::len).unwrap_or(0)
    }

    /// Determines if there are no cached entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bytes occupied by the cached keys and values.
    pub fn allocated_memory(&self) -> usize {
        self.lru
            .lock()
            .as_ref()
            .map(LRUCache::allocated_memory)
            .unwrap_or(0)
    }

    /// Returns the maximal number of bytes to be occupied by this cache.
    pub fn cache_bytes(&self) -> usize {
        self.cache_bytes
    }

    /// Determines if the underlying LRU cache has already been created.
    pub fn is_allocated(&self) -> bool {
        self.lru.lock().is_some()
    }
}
