//! Provides the group, a named cache namespace which loads values on demand.
//!
//! A [Group] combines three sources for a value, which are queried in the following order:
//! 1. The local [SyncCache]. A hit is immediately returned.
//! 2. The peer which owns the key (if a [PeerPicker] has been registered). If the peer delivers
//!    the value, it is returned as is (it is not put into the local cache, as the peer is the
//!    owner). Failures of peers are only logged and counted.
//! 3. The origin loader (the [Getter] of the group). A loaded value is put into the local cache
//!    and returned. An error of the loader is reported to the caller.
//!
//! Groups are created and managed by a [Registry](crate::registry::Registry).
//!
//! # Examples
//!
//! ```
//! # use std::sync::Arc;
//! # use peercache::group::GetterFunc;
//! # use peercache::registry::Registry;
//! # #[tokio::main]
//! # async fn main() {
//! let registry = Registry::new();
//! let scores = registry.new_group(
//!     "scores",
//!     2048,
//!     Arc::new(GetterFunc::new(|key| match key {
//!         "Tom" => Ok(b"630".to_vec()),
//!         _ => Err(anyhow::anyhow!("{} does not exist", key)),
//!     })),
//! );
//!
//! assert_eq!(scores.get("Tom").await.unwrap().to_string(), "630");
//! assert_eq!(scores.get("unknown").await.is_err(), true);
//! # }
//! ```
use std::fmt;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::average::Average;
use crate::byteview::ByteView;
use crate::cache::SyncCache;
use crate::error::CacheError;
use crate::fmt::format_size;
use crate::peers::{PeerError, PeerOutcome, PeerPicker, Request};

/// Loads a value from its origin (e.g. a database) once it is neither cached nor provided by
/// a peer.
#[async_trait::async_trait]
pub trait Getter: Send + Sync {
    /// Loads the value for the given key.
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>>;
}

/// Adapts a plain function or closure to a [Getter].
///
/// # Examples
/// ```
/// # use peercache::group::{Getter, GetterFunc};
/// # #[tokio::main]
/// # async fn main() {
/// let getter = GetterFunc::new(|key| Ok(key.as_bytes().to_vec()));
/// assert_eq!(getter.get("key").await.unwrap(), b"key".to_vec());
/// # }
/// ```
pub struct GetterFunc<F>(F);

impl<F> GetterFunc<F>
where
    F: Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    /// Wraps the given function into a [Getter].
    pub fn new(func: F) -> Self {
        GetterFunc(func)
    }
}

#[async_trait::async_trait]
impl<F> Getter for GetterFunc<F>
where
    F: Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        (self.0)(key)
    }
}

/// Keeps track of how a group answered its requests.
#[derive(Default)]
pub struct GroupStats {
    gets: AtomicU64,
    cache_hits: AtomicU64,
    peer_loads: AtomicU64,
    peer_misses: AtomicU64,
    peer_errors: AtomicU64,
    local_loads: AtomicU64,
    local_load_errors: AtomicU64,
    load_duration: Average,
}

fn increment(counter: &AtomicU64) {
    let _ = counter.fetch_add(1, Ordering::Relaxed);
}

/// Converts a load duration into microseconds, saturating at the range of an [Average].
fn duration_micros(duration: Duration) -> i32 {
    i32::try_from(duration.as_micros()).unwrap_or(i32::MAX)
}

impl GroupStats {
    /// Returns the number of lookups (including the ones for invalid keys).
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    /// Returns the number of lookups answered by the local cache.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Returns the number of values delivered by peers.
    pub fn peer_loads(&self) -> u64 {
        self.peer_loads.load(Ordering::Relaxed)
    }

    /// Returns the number of requests for which the picked peer had no value.
    pub fn peer_misses(&self) -> u64 {
        self.peer_misses.load(Ordering::Relaxed)
    }

    /// Returns the number of failed peer requests.
    pub fn peer_errors(&self) -> u64 {
        self.peer_errors.load(Ordering::Relaxed)
    }

    /// Returns the number of values successfully loaded from the origin.
    pub fn local_loads(&self) -> u64 {
        self.local_loads.load(Ordering::Relaxed)
    }

    /// Returns the number of failed loads from the origin.
    pub fn local_load_errors(&self) -> u64 {
        self.local_load_errors.load(Ordering::Relaxed)
    }

    /// Returns the average duration of origin loads in microseconds.
    pub fn load_duration(&self) -> &Average {
        &self.load_duration
    }
}

impl Display for GroupStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gets: {}, hits: {}, peer loads: {}, peer misses: {}, peer errors: {}, \
             local loads: {}, local load errors: {}, load duration: {}",
            self.gets(),
            self.cache_hits(),
            self.peer_loads(),
            self.peer_misses(),
            self.peer_errors(),
            self.local_loads(),
            self.local_load_errors(),
            self.load_duration
        )
    }
}

/// Represents a named cache namespace along with the loader which fetches missing values.
pub struct Group {
    name: String,
    getter: Arc<dyn Getter>,
    main_cache: SyncCache,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    stats: GroupStats,
}

impl Group {
    pub(crate) fn new(name: &str, cache_bytes: usize, getter: Arc<dyn Getter>) -> Self {
        Group {
            name: name.to_owned(),
            getter,
            main_cache: SyncCache::new(cache_bytes),
            peers: OnceLock::new(),
            stats: GroupStats::default(),
        }
    }

    /// Returns the name of this group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the maximal number of bytes to be cached locally.
    pub fn cache_bytes(&self) -> usize {
        self.main_cache.cache_bytes()
    }

    /// Returns the statistics of this group.
    pub fn stats(&self) -> &GroupStats {
        &self.stats
    }

    /// Returns the number of locally cached entries.
    pub fn cached_entries(&self) -> usize {
        self.main_cache.len()
    }

    /// Returns the number of bytes occupied by locally cached entries.
    pub fn cached_bytes(&self) -> usize {
        self.main_cache.allocated_memory()
    }

    /// Installs the picker used to determine the owning peer of a key.
    ///
    /// # Panics
    /// Panics if a picker has already been registered for this group.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) {
        if self.peers.set(peers).is_err() {
            panic!(
                "register_peers has been called more than once for group '{}'!",
                self.name
            );
        }
    }

    /// Returns the value for the given key.
    ///
    /// See the [module documentation](crate::group) for the order in which the value is looked
    /// up.
    ///
    /// Note that concurrent requests for the same missing key are not coalesced. Each of them
    /// will query the peer or invoke the origin loader on its own.
    ///
    /// # Errors
    /// Fails with [CacheError::InvalidKey] for an empty key and with [CacheError::OriginLoad] if
    /// the origin loader fails. In the latter case the cache remains unchanged.
    pub async fn get(&self, key: &str) -> Result<ByteView, CacheError> {
        increment(&self.stats.gets);

        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        if let Some(value) = self.main_cache.get(key) {
            log::debug!("Cache hit for '{}' in group '{}'", key, self.name);
            increment(&self.stats.cache_hits);
            return Ok(value);
        }

        self.load(key).await
    }

    async fn load(&self, key: &str) -> Result<ByteView, CacheError> {
        match self.load_from_peer(key).await {
            PeerOutcome::Hit(value) => return Ok(value),
            PeerOutcome::NotConfigured | PeerOutcome::NoPeer => (),
            outcome @ PeerOutcome::Miss => {
                log::debug!("Falling back to origin for '{}' ({})", key, outcome)
            }
            outcome @ PeerOutcome::Failed(_) => log::warn!(
                "Failed to get '{}' of group '{}' from peer, falling back to origin: {}",
                key,
                self.name,
                outcome
            ),
        }

        self.get_locally(key).await
    }

    async fn load_from_peer(&self, key: &str) -> PeerOutcome {
        let picker = match self.peers.get() {
            Some(picker) => picker,
            None => return PeerOutcome::NotConfigured,
        };
        let peer = match picker.pick_peer(key) {
            Some(peer) => peer,
            None => return PeerOutcome::NoPeer,
        };

        let request = Request {
            group: self.name.clone(),
            key: key.to_owned(),
        };
        match peer.get(&request).await {
            Ok(response) => {
                increment(&self.stats.peer_loads);
                PeerOutcome::Hit(ByteView::from(response.value))
            }
            Err(PeerError::Miss) => {
                increment(&self.stats.peer_misses);
                PeerOutcome::Miss
            }
            Err(PeerError::Transport(error)) => {
                increment(&self.stats.peer_errors);
                PeerOutcome::Failed(error)
            }
        }
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView, CacheError> {
        let watch = Instant::now();
        let result = self.getter.get(key).await;
        self.stats
            .load_duration
            .add(duration_micros(watch.elapsed()));

        match result {
            Ok(data) => {
                increment(&self.stats.local_loads);
                // The loader handed over its buffer, so nobody else can modify the cached data...
                let value = ByteView::from(data);
                self.populate_cache(key, value.clone());
                Ok(value)
            }
            Err(source) => {
                increment(&self.stats.local_load_errors);
                Err(CacheError::OriginLoad {
                    group: self.name.clone(),
                    key: key.to_owned(),
                    source,
                })
            }
        }
    }

    fn populate_cache(&self, key: &str, value: ByteView) {
        let size = value.len();
        if let Err(error) = self.main_cache.add(key, value) {
            log::warn!(
                "Not caching '{}' ({}) in group '{}': {}",
                key,
                format_size(size),
                self.name,
                error
            );
        }
    }
}
