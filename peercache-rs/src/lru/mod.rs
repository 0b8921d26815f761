//! Provides a memory constrained LRU Cache.
//!
//! An LRU cache drops the least recently used entry if it is about to grow beyond the given
//! limit. The limit is expressed in bytes and accounts for the keys as well as for the values.
//! Values can be of any type for which the [ByteSize](ByteSize) trait is implemented.
//!
//! The cache itself is not synchronized. The [cache](crate::cache) module wraps it into a lock
//! so that it can be shared by all callers of a [Group](crate::group::Group).
mod lru_cache;

pub use lru_cache::ByteSize;
pub use lru_cache::EvictionCallback;
pub use lru_cache::LRUCache;
