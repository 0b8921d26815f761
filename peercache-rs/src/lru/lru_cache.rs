use linked_hash_map::LinkedHashMap;

/// Returns the allocated memory in bytes.
pub trait ByteSize {
    /// Returns the amount of memory in bytes which is accounted for this value.
    ///
    /// Note that most probably this is an approximation and not the exact byte value. However,
    /// it should represent the "largest" part of an instance. (E.g. for a string, this would
    /// be the bytes stored on the heap and might discard the fields allocated on the stack
    /// used to store the length and capacity as well as the pointer itself.
    fn allocated_size(&self) -> usize;
}

impl ByteSize for String {
    fn allocated_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for Vec<u8> {
    fn allocated_size(&self) -> usize {
        self.len()
    }
}

/// Represents a callback which is invoked for each entry evicted via
/// [remove_oldest](LRUCache::remove_oldest).
pub type EvictionCallback<V> = Box<dyn FnMut(&str, &V) + Send>;

/// Provides a memory constrained LRU cache.
///
/// A cache behaves just like a **Map** as long as there is no shortage in storage. However, once
/// the accounted memory would grow beyond **max_memory**, old (least recently used) entries will
/// be evicted - hence the name LRU cache.
///
/// The memory of an entry is computed as the length of its key plus the
/// [allocated_size](ByteSize::allocated_size) of its value. Therefore the budget also bounds the
/// memory occupied by the keys and not only the payload.
///
/// Note that this cache is not synchronized. See [SyncCache](crate::cache::SyncCache) for a
/// variant which can be shared between threads.
///
/// # Examples
/// ```
/// # use peercache::lru::LRUCache;
/// // Specifies a cache which can store up to 1024 bytes of keys and values.
/// let mut lru = LRUCache::new(1024);
///
/// lru.put("Foo".to_owned(), "Bar".to_owned()).unwrap();
/// assert_eq!(lru.get("Foo").unwrap(), &"Bar".to_owned());
///
/// // this will still fit..
/// lru.put("Foo1".to_owned(), "X".repeat(512)).unwrap();
/// assert_eq!(lru.get("Foo").is_some(), true);
/// assert_eq!(lru.get("Foo1").is_some(), true);
///
/// // this will hit the max memory constraint...
/// lru.put("Foo2".to_owned(), "X".repeat(512)).unwrap();
/// // ..and therefore will throw the least recently used entry out:
/// assert_eq!(lru.get("Foo").is_some(), false);
/// assert_eq!(lru.get("Foo1").is_some(), false);
/// assert_eq!(lru.get("Foo2").is_some(), true);
///```
pub struct LRUCache<V: ByteSize> {
    allocated_memory: usize,
    max_memory: usize,
    reads: usize,
    hits: usize,
    writes: usize,
    map: LinkedHashMap<String, Entry<V>>,
    on_evicted: Option<EvictionCallback<V>>,
}

struct Entry<V: ByteSize> {
    mem_size: usize,
    value: V,
}

impl<V: ByteSize> LRUCache<V> {
    /// Creates a new cache which can store as many entries until they occupy **max_memory**
    /// bytes.
    pub fn new(max_memory: usize) -> Self {
        LRUCache {
            allocated_memory: 0,
            max_memory,
            reads: 0,
            hits: 0,
            writes: 0,
            map: LinkedHashMap::new(),
            on_evicted: None,
        }
    }

    /// Creates a new cache just like [new](LRUCache::new) which invokes the given callback for
    /// each evicted entry.
    ///
    /// Note that the callback is only invoked when an entry is dropped to make room (or via an
    /// explicit call to [remove_oldest](LRUCache::remove_oldest)). Replacing the value of an
    /// existing key doesn't count as eviction.
    ///
    /// # Examples
    /// ```
    /// # use peercache::lru::LRUCache;
    /// # use std::sync::{Arc, Mutex};
    /// let evicted = Arc::new(Mutex::new(Vec::new()));
    /// let evicted_keys = evicted.clone();
    /// let mut lru = LRUCache::with_eviction_callback(
    ///     8,
    ///     Box::new(move |key: &str, _: &String| evicted_keys.lock().unwrap().push(key.to_owned())),
    /// );
    ///
    /// lru.put("A".to_owned(), "1".to_owned()).unwrap();
    /// lru.put("B".to_owned(), "2".to_owned()).unwrap();
    /// lru.put("C".to_owned(), "3".to_owned()).unwrap();
    /// lru.put("D".to_owned(), "4".to_owned()).unwrap();
    /// lru.put("E".to_owned(), "5".to_owned()).unwrap();
    ///
    /// assert_eq!(*evicted.lock().unwrap(), vec!["A".to_owned()]);
    /// ```
    pub fn with_eviction_callback(max_memory: usize, on_evicted: EvictionCallback<V>) -> Self {
        let mut cache = LRUCache::new(max_memory);
        cache.on_evicted = Some(on_evicted);

        cache
    }

    /// Stores the given value for the given key.
    ///
    /// If the key is already present, its value is replaced and the entry is marked as most
    /// recently used. Otherwise, least recently used entries are evicted until the new entry
    /// fits and it is then inserted.
    ///
    /// # Errors
    /// Fails if the given entry is larger than **max_memory** (the max total size of the cache).
    /// In this case the cache remains unchanged.
    ///
    /// # Examples
    /// ```
    /// # use peercache::lru::LRUCache;
    /// let mut lru = LRUCache::new(16);
    ///
    /// lru.put("Foo".to_owned(), "Bar".to_owned()).unwrap();
    /// assert_eq!(lru.get("Foo").unwrap(), &"Bar".to_owned());
    ///
    /// // An entry which could never fit is rejected...
    /// assert_eq!(lru.put("Foo1".to_owned(), "X".repeat(16)).is_err(), true);
    /// // ..and leaves the cache untouched.
    /// assert_eq!(lru.get("Foo").unwrap(), &"Bar".to_owned());
    ///```
    pub fn put(&mut self, key: String, value: V) -> anyhow::Result<()> {
        let mem_size = key.len() + value.allocated_size();
        if mem_size > self.max_memory {
            return Err(anyhow::anyhow!(
                "The entry to be cached ({} bytes) is larger than the whole cache size ({} bytes)!",
                mem_size,
                self.max_memory
            ));
        }

        self.writes += 1;

        if let Some(entry) = self.map.get_refresh(&key) {
            let stale_entry = std::mem::replace(entry, Entry { mem_size, value });
            self.allocated_memory = self.allocated_memory + mem_size - stale_entry.mem_size;

            // The updated entry is now the most recently used one and fits on its own, therefore
            // this loop always stops before reaching it...
            while self.allocated_memory > self.max_memory {
                let _ = self.remove_oldest();
            }
        } else {
            while self.allocated_memory + mem_size > self.max_memory && self.remove_oldest() {}

            let _ = self.map.insert(key, Entry { mem_size, value });
            self.allocated_memory += mem_size;
        }

        Ok(())
    }

    /// Returns the value which has previously been stored for the given key or **None** if
    /// no value is present.
    ///
    /// A successful lookup marks the entry as most recently used.
    ///
    /// # Examples
    /// ```
    /// # use peercache::lru::LRUCache;
    /// let mut lru = LRUCache::new(1024);
    ///
    /// // After inserting a value...
    /// lru.put("Foo".to_owned(), "Bar".to_owned()).unwrap();
    /// // ..it can be retrieved.
    /// assert_eq!(lru.get("Foo").unwrap(), &"Bar".to_owned());
    /// assert_eq!(lru.get("Unknown"), None);
    ///```
    pub fn get(&mut self, key: &str) -> Option<&V> {
        self.reads += 1;

        match self.map.get_refresh(key) {
            Some(entry) => {
                self.hits += 1;
                Some(&entry.value)
            }
            None => None,
        }
    }

    /// Removes the least recently used entry.
    ///
    /// Invokes the eviction callback (if present) for the removed entry. Returns **false** if the
    /// cache was already empty.
    ///
    /// # Examples
    /// ```
    /// # use peercache::lru::LRUCache;
    /// let mut lru = LRUCache::new(1024);
    /// lru.put("Foo".to_owned(), "Bar".to_owned()).unwrap();
    /// lru.put("Foo1".to_owned(), "Bar".to_owned()).unwrap();
    ///
    /// // "Foo" is used, so that "Foo1" becomes the least recently used entry...
    /// let _ = lru.get("Foo");
    /// assert_eq!(lru.remove_oldest(), true);
    /// assert_eq!(lru.get("Foo1"), None);
    ///
    /// assert_eq!(lru.remove_oldest(), true);
    /// assert_eq!(lru.remove_oldest(), false);
    /// ```
    pub fn remove_oldest(&mut self) -> bool {
        match self.map.pop_front() {
            Some((key, entry)) => {
                self.allocated_memory -= entry.mem_size;
                if let Some(on_evicted) = self.on_evicted.as_mut() {
                    on_evicted(&key, &entry.value);
                }

                true
            }
            None => false,
        }
    }

    /// Returns the number of elements in the cache.
    ///
    /// # Examples
    /// ```
    /// # use peercache::lru::LRUCache;
    /// let mut lru = LRUCache::new(1024);
    ///
    /// assert_eq!(lru.len(), 0);
    /// lru.put("Foo".to_owned(), "Bar".to_owned()).unwrap();
    /// assert_eq!(lru.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Determines if the cache is completely empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the maximal amount of memory to be occupied by the keys and values of this cache.
    pub fn max_memory(&self) -> usize {
        self.max_memory
    }

    /// Returns the amount of memory allocated to store the data of the keys and values of this
    /// cache.
    ///
    /// The returned value is in bytes. Note that this is most probably a rough estimate but should
    /// account for the largest part of allocated memory.
    pub fn allocated_memory(&self) -> usize {
        self.allocated_memory
    }

    /// Returns the memory utilization in percent.
    pub fn memory_utilization(&self) -> f32 {
        match self.max_memory {
            0 => 0.,
            n => self.allocated_memory as f32 / n as f32 * 100.,
        }
    }

    /// Returns the cache hit rate in percent.
    pub fn hit_rate(&self) -> f32 {
        match self.reads {
            0 => 0.,
            n => self.hits as f32 / n as f32 * 100.,
        }
    }

    /// Returns the total number of reads performed on this cache.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Returns the total number of writes performed on this cache.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

#[cfg(test)]
mod tests {
    use crate::lru::LRUCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn max_memory_is_enforced() {
        let mut lru = LRUCache::new(12 * 4);

        // We expect 4 entries with a size of 12 bytes each to fully fit in the cache....
        lru.put("Hello0".to_owned(), "World0".to_owned()).unwrap();
        lru.put("Hello1".to_owned(), "World1".to_owned()).unwrap();
        lru.put("Hello2".to_owned(), "World2".to_owned()).unwrap();
        lru.put("Hello3".to_owned(), "World3".to_owned()).unwrap();
        assert_eq!(lru.len(), 4);
        assert_eq!(lru.allocated_memory(), 12 * 4);
        assert_eq!(lru.get("Hello0").unwrap(), &"World0".to_owned());
        assert_eq!(lru.get("Hello1").unwrap(), &"World1".to_owned());
        assert_eq!(lru.get("Hello2").unwrap(), &"World2".to_owned());
        assert_eq!(lru.get("Hello3").unwrap(), &"World3".to_owned());

        // If we replace an entry, the used memory is corrected...
        lru.put("Hello1".to_owned(), "".to_owned()).unwrap();
        assert_eq!(lru.allocated_memory(), 12 * 4 - 6);

        // Restore the original entry...
        lru.put("Hello1".to_owned(), "World1".to_owned()).unwrap();
        assert_eq!(lru.allocated_memory(), 12 * 4);
        assert_eq!(lru.len(), 4);

        // If we now add an entry with is 13 bytes long, two entries have to be dropped...
        lru.put("Hello4".to_owned(), "World01".to_owned()).unwrap();
        assert_eq!(lru.allocated_memory(), 12 * 2 + 13);
        assert_eq!(lru.len(), 3);

        // "Hello0" and "Hello2" were the least recently touched/modified, so they will have been
        // evicted to make room for our new entry...
        assert_eq!(lru.get("Hello0"), None);
        assert_eq!(lru.get("Hello2"), None);
        assert_eq!(lru.get("Hello3").is_some(), true);
        assert_eq!(lru.get("Hello1").is_some(), true);
    }

    #[test]
    fn growing_an_entry_evicts_older_ones() {
        let mut lru = LRUCache::new(20);
        lru.put("k1".to_owned(), "12345678".to_owned()).unwrap();
        lru.put("k2".to_owned(), "12345678".to_owned()).unwrap();
        assert_eq!(lru.allocated_memory(), 20);

        // Growing "k2" requires to drop "k1", but never "k2" itself...
        lru.put("k2".to_owned(), "1234567890".to_owned()).unwrap();
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.allocated_memory(), 12);
        assert_eq!(lru.get("k1"), None);
        assert_eq!(lru.get("k2").unwrap(), &"1234567890".to_owned());
    }

    #[test]
    fn budget_holds_after_each_put() {
        let mut lru = LRUCache::new(64);
        for i in 0..200 {
            let value = "X".repeat(i % 23);
            lru.put(format!("key{}", i % 37), value).unwrap();
            assert_eq!(lru.allocated_memory() <= lru.max_memory(), true);
        }
    }

    #[test]
    fn oversized_entries_are_rejected() {
        let mut lru = LRUCache::new(10);
        lru.put("A".to_owned(), "B".to_owned()).unwrap();

        assert_eq!(lru.put("Big".to_owned(), "X".repeat(8)).is_err(), true);
        assert_eq!(lru.put("A".to_owned(), "X".repeat(10)).is_err(), true);

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.allocated_memory(), 2);
        assert_eq!(lru.get("A").unwrap(), &"B".to_owned());
    }

    #[test]
    fn touched_entries_survive_remove_oldest() {
        let mut lru = LRUCache::new(1024);
        lru.put("A".to_owned(), "1".to_owned()).unwrap();
        lru.put("B".to_owned(), "2".to_owned()).unwrap();
        lru.put("C".to_owned(), "3".to_owned()).unwrap();

        let _ = lru.get("A");
        assert_eq!(lru.remove_oldest(), true);
        assert_eq!(lru.get("B"), None);
        assert_eq!(lru.remove_oldest(), true);
        assert_eq!(lru.get("C"), None);
        assert_eq!(lru.get("A").is_some(), true);
        assert_eq!(lru.allocated_memory(), 2);
    }

    #[test]
    fn eviction_callback_only_fires_for_evictions() {
        let evictions = Arc::new(AtomicUsize::new(0));
        let counter = evictions.clone();
        let mut lru = LRUCache::with_eviction_callback(
            10,
            Box::new(move |_: &str, _: &String| {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        lru.put("k1".to_owned(), "v1".to_owned()).unwrap();
        lru.put("k2".to_owned(), "v2".to_owned()).unwrap();

        // Replacing a value is not an eviction...
        lru.put("k1".to_owned(), "v3".to_owned()).unwrap();
        assert_eq!(evictions.load(Ordering::SeqCst), 0);

        // ..but making room for a new entry is (k2 and k1 have to go)...
        lru.put("k3".to_owned(), "v3456".to_owned()).unwrap();
        assert_eq!(evictions.load(Ordering::SeqCst), 2);
        assert_eq!(lru.len(), 1);

        // Removing from an empty cache doesn't invoke the callback...
        assert_eq!(lru.remove_oldest(), true);
        assert_eq!(lru.remove_oldest(), false);
        assert_eq!(evictions.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn metrics_are_computed_correctly() {
        let mut lru = LRUCache::new(10);

        // Write 3 values into the cache...
        lru.put("A".to_owned(), "A".to_owned()).unwrap();
        lru.put("B".to_owned(), "B".to_owned()).unwrap();
        lru.put("C".to_owned(), "C".to_owned()).unwrap();

        // Perform 4 reads, of which 3 hit a cache entry...
        assert_eq!(lru.get("A").is_some(), true);
        assert_eq!(lru.get("B").is_some(), true);
        assert_eq!(lru.get("C").is_some(), true);
        assert_eq!(lru.get("D").is_none(), true);

        assert_eq!(lru.writes(), 3);
        assert_eq!(lru.reads(), 4);
        assert_eq!(lru.hit_rate().round() as i32, 75);

        // The cache contains 6 bytes of data and has a max memory of 10 -> 60% memory utilization..
        assert_eq!(lru.memory_utilization().round() as i32, 60);
    }
}
