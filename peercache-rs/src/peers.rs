//! Defines the capabilities used to delegate lookups to other cache processes.
//!
//! A [Group](crate::group::Group) can be equipped with a [PeerPicker] which determines the peer
//! owning a given key. The picked [PeerGetter] is then asked for the value. How a request is
//! actually transferred to the remote process (HTTP, RPC, ...) is up to the implementation of
//! the [PeerGetter].
//!
//! The [RingPicker] is the default picker. It keeps a [HashRing] of all known peers and never
//! picks the local process itself.
//!
//! # Examples
//!
//! ```
//! # use std::sync::Arc;
//! # use peercache::peers::{PeerError, PeerGetter, PeerPicker, Request, Response, RingPicker};
//! struct Remote;
//!
//! #[async_trait::async_trait]
//! impl PeerGetter for Remote {
//!     async fn get(&self, request: &Request) -> Result<Response, PeerError> {
//!         Ok(Response { value: request.key.as_bytes().to_vec() })
//!     }
//! }
//!
//! let picker = RingPicker::new("10.0.0.1:8000", 50);
//! let remote: Arc<dyn PeerGetter> = Arc::new(Remote);
//! picker.set_peers(vec![("10.0.0.2:8000".to_owned(), remote)]);
//!
//! // The local process is not part of the ring, therefore every key is owned by the remote...
//! assert_eq!(picker.pick_peer("Tom").is_some(), true);
//! ```
use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::RwLock;
use thiserror::Error;

use crate::byteview::ByteView;
use crate::consistenthash::HashRing;

/// Represents a request sent to a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Contains the name of the group to query.
    pub group: String,
    /// Contains the key to look up.
    pub key: String,
}

/// Represents the answer of a peer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    /// Contains the value delivered by the peer.
    pub value: Vec<u8>,
}

/// Describes why a peer didn't deliver a value.
#[derive(Error, Debug)]
pub enum PeerError {
    /// The peer has no value for the requested key.
    #[error("The peer has no value for the requested key.")]
    Miss,

    /// The request couldn't be transferred or processed.
    #[error("Failed to query peer: {0}")]
    Transport(#[source] anyhow::Error),
}

/// Fetches values from a remote cache process.
#[async_trait::async_trait]
pub trait PeerGetter: Send + Sync {
    /// Asks the peer for the value of the given group and key.
    async fn get(&self, request: &Request) -> Result<Response, PeerError>;
}

/// Determines the peer which owns a given key.
///
/// For a given key and set of peers, an implementation must always pick the same peer. It
/// returns **None** if the key should be handled locally.
pub trait PeerPicker: Send + Sync {
    /// Picks the peer responsible for the given key.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

/// Describes the outcome of trying to obtain a value from a peer.
///
/// Independent of the outcome (except for a [Hit](PeerOutcome::Hit)) a
/// [Group](crate::group::Group) falls back to its origin loader. However, we keep these cases
/// apart so that they can be logged and counted properly.
#[derive(Debug)]
pub enum PeerOutcome {
    /// No [PeerPicker] has been registered.
    NotConfigured,
    /// The picker didn't select a remote peer (most probably the key is owned locally).
    NoPeer,
    /// The peer delivered the value.
    Hit(ByteView),
    /// The peer has no value for the key.
    Miss,
    /// Querying the peer failed.
    Failed(anyhow::Error),
}

impl Display for PeerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerOutcome::NotConfigured => write!(f, "no peers configured"),
            PeerOutcome::NoPeer => write!(f, "owned locally"),
            PeerOutcome::Hit(value) => write!(f, "hit ({} bytes)", value.len()),
            PeerOutcome::Miss => write!(f, "peer miss"),
            PeerOutcome::Failed(error) => write!(f, "peer error: {}", error),
        }
    }
}

struct RingState {
    ring: HashRing,
    getters: FnvHashMap<String, Arc<dyn PeerGetter>>,
}

/// Picks peers using a consistent [HashRing].
///
/// The picker knows the id of the local process. Keys which are owned by the local process
/// yield **None** so that they are loaded from the origin.
pub struct RingPicker {
    self_id: String,
    replicas: usize,
    state: RwLock<RingState>,
}

impl RingPicker {
    /// Creates a new picker for the process with the given id which places **replicas** virtual
    /// nodes per peer.
    pub fn new(self_id: impl Into<String>, replicas: usize) -> Self {
        RingPicker {
            self_id: self_id.into(),
            replicas,
            state: RwLock::new(RingState {
                ring: HashRing::new(replicas, None),
                getters: FnvHashMap::default(),
            }),
        }
    }

    /// Replaces the set of known peers.
    ///
    /// The ring is rebuilt from scratch, so that every process which is given the same set of
    /// peers ends up with the same routing. The local process should be part of the given peers
    /// (its getter is never invoked) so that it owns its share of the keys.
    pub fn set_peers(&self, peers: impl IntoIterator<Item = (String, Arc<dyn PeerGetter>)>) {
        let getters: FnvHashMap<String, Arc<dyn PeerGetter>> = peers.into_iter().collect();
        let mut ids: Vec<&String> = getters.keys().collect();
        ids.sort_unstable();

        let mut ring = HashRing::new(self.replicas, None);
        ring.add(&ids);

        log::info!(
            "Peer ring of {} has been updated: {} peers, {} virtual nodes.",
            self.self_id,
            getters.len(),
            ring.len()
        );

        *self.state.write() = RingState { ring, getters };
    }

    /// Returns the id of the local process.
    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    /// Returns the ids of all known peers.
    pub fn peers(&self) -> Vec<String> {
        let state = self.state.read();
        state.ring.peers().into_iter().map(str::to_owned).collect()
    }
}

impl PeerPicker for RingPicker {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.read();
        match state.ring.get(key) {
            Some(peer) if peer != self.self_id => {
                log::debug!("Picked peer {} for key {}", peer, key);
                state.getters.get(peer).cloned()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::peers::{PeerError, PeerGetter, PeerPicker, Request, Response, RingPicker};
    use std::sync::Arc;

    struct NamedPeer(&'static str);

    #[async_trait::async_trait]
    impl PeerGetter for NamedPeer {
        async fn get(&self, _request: &Request) -> Result<Response, PeerError> {
            Ok(Response {
                value: self.0.as_bytes().to_vec(),
            })
        }
    }

    fn peer(name: &'static str) -> (String, Arc<dyn PeerGetter>) {
        (name.to_owned(), Arc::new(NamedPeer(name)))
    }

    #[test]
    fn an_empty_picker_picks_nothing() {
        let picker = RingPicker::new("local", 10);
        assert_eq!(picker.pick_peer("Tom").is_none(), true);
        assert_eq!(picker.peers().is_empty(), true);
    }

    #[test]
    fn the_local_process_is_never_picked() {
        let picker = RingPicker::new("local", 10);
        picker.set_peers(vec![peer("local")]);

        for i in 0..100 {
            assert_eq!(picker.pick_peer(&format!("key-{}", i)).is_none(), true);
        }
    }

    #[test]
    fn keys_are_split_between_local_and_remote_peers() {
        let picker = RingPicker::new("local", 50);
        picker.set_peers(vec![peer("local"), peer("remote")]);
        assert_eq!(picker.peers(), vec!["local".to_owned(), "remote".to_owned()]);
        assert_eq!(picker.self_id(), "local");

        let remote_keys = (0..1000)
            .filter(|i| picker.pick_peer(&format!("key-{}", i)).is_some())
            .count();
        assert_eq!(remote_keys > 0 && remote_keys < 1000, true);
    }

    #[test]
    fn picking_is_deterministic() {
        let first = RingPicker::new("a", 50);
        first.set_peers(vec![peer("a"), peer("b"), peer("c")]);
        let second = RingPicker::new("a", 50);
        second.set_peers(vec![peer("c"), peer("b"), peer("a")]);

        crate::testing::test_async(async move {
            for i in 0..100 {
                let key = format!("key-{}", i);
                let request = Request {
                    group: "test".to_owned(),
                    key: key.clone(),
                };
                match (first.pick_peer(&key), second.pick_peer(&key)) {
                    (Some(left), Some(right)) => assert_eq!(
                        left.get(&request).await.unwrap(),
                        right.get(&request).await.unwrap()
                    ),
                    (None, None) => (),
                    _ => panic!("Both pickers should agree on the owner of {}", key),
                }
            }
        });
    }
}
