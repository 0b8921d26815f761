//! Provides a consistent hash ring which maps keys to peers.
//!
//! Each peer is placed on the ring several times (as so called virtual nodes). A key is owned by
//! the first virtual node whose hash is greater or equal to the hash of the key. If there is no
//! such node, we wrap around and use the very first one.
//!
//! Using many virtual nodes per peer keeps the ranges owned by each peer roughly equal in size,
//! even if only a handful of peers are present or the hash function is a bit skewed. As long as
//! all processes use the same hash function and replica count, they all agree on the owner of a
//! key without any coordination.
//!
//! # Examples
//!
//! ```
//! # use peercache::consistenthash::HashRing;
//! let mut ring = HashRing::new(50, None);
//! ring.add(&["10.0.0.1:8000", "10.0.0.2:8000", "10.0.0.3:8000"]);
//!
//! let owner = ring.get("Tom").unwrap();
//! // The same key is always routed to the same peer...
//! assert_eq!(ring.get("Tom").unwrap(), owner);
//! ```
use fnv::FnvHashMap;
use std::collections::hash_map::Entry;

/// Specifies the number of virtual nodes per peer used by [HashRing::default].
pub const DEFAULT_REPLICAS: usize = 50;

/// Describes the hash function used to place virtual nodes and keys on the ring.
pub type HashFn = fn(&[u8]) -> u32;

/// Maps keys to peers using consistent hashing.
///
/// Note that the ring is not synchronized. [RingPicker](crate::peers::RingPicker) provides a
/// thread safe wrapper.
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    keys: Vec<u32>,
    hash_map: FnvHashMap<u32, String>,
}

impl Default for HashRing {
    fn default() -> Self {
        HashRing::new(DEFAULT_REPLICAS, None)
    }
}

impl HashRing {
    /// Creates a new ring which places **replicas** virtual nodes for each peer.
    ///
    /// If no hash function is given, the CRC-32 (IEEE) checksum is used.
    pub fn new(replicas: usize, hash: Option<HashFn>) -> Self {
        HashRing {
            hash: hash.unwrap_or(crc32fast::hash),
            replicas,
            keys: Vec::new(),
            hash_map: FnvHashMap::default(),
        }
    }

    /// Adds the given peers to the ring.
    ///
    /// The virtual node **i** of a peer is placed at the hash of the string **i** followed by the
    /// peer id. Adding a peer which is already present doesn't change the ring.
    ///
    /// If virtual nodes of two peers collide, the node belongs to the peer with the smaller id.
    /// Therefore the ring only depends on the set of peers and not on the order in which they
    /// were added.
    pub fn add<S: AsRef<str>>(&mut self, peers: &[S]) {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let hash = (self.hash)(format!("{}{}", i, peer).as_bytes());
                match self.hash_map.entry(hash) {
                    Entry::Occupied(mut owner) => {
                        if peer < owner.get().as_str() {
                            let _ = owner.insert(peer.to_owned());
                        }
                    }
                    Entry::Vacant(node) => {
                        self.keys.push(hash);
                        let _ = node.insert(peer.to_owned());
                    }
                }
            }
        }

        self.keys.sort_unstable();
        self.keys.dedup();
    }

    /// Returns the peer which owns the given key.
    ///
    /// Returns **None** for an empty key or if no peers have been added yet.
    pub fn get(&self, key: &str) -> Option<&str> {
        if key.is_empty() || self.keys.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let index = self.keys.partition_point(|node| *node < hash);
        let node = self.keys[index % self.keys.len()];

        self.hash_map.get(&node).map(String::as_str)
    }

    /// Returns the number of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Determines if no peers have been added yet.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the number of virtual nodes per peer.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Returns all distinct peers on the ring in ascending order.
    pub fn peers(&self) -> Vec<&str> {
        let mut peers: Vec<&str> = self.hash_map.values().map(String::as_str).collect();
        peers.sort_unstable();
        peers.dedup();

        peers
    }
}

#[cfg(test)]
mod tests {
    use crate::consistenthash::{HashRing, DEFAULT_REPLICAS};

    /// Uses the decimal value of the key as hash, so that the ring layout is easy to follow.
    fn numeric_hash(data: &[u8]) -> u32 {
        std::str::from_utf8(data)
            .ok()
            .and_then(|str| str.parse().ok())
            .unwrap_or(0)
    }

    #[test]
    fn keys_are_routed_to_the_next_virtual_node() {
        let mut ring = HashRing::new(3, Some(numeric_hash));

        // Given the above hash function, this will give replicas with "hashes":
        // 2, 4, 6, 12, 14, 16, 22, 24, 26
        ring.add(&["6", "4", "2"]);
        assert_eq!(ring.len(), 9);

        assert_eq!(ring.get("2"), Some("2"));
        assert_eq!(ring.get("11"), Some("2"));
        assert_eq!(ring.get("23"), Some("4"));
        // 27 is beyond the largest node and therefore wraps around to 2...
        assert_eq!(ring.get("27"), Some("2"));

        // Adds 8, 18, 28...
        ring.add(&["8"]);
        assert_eq!(ring.get("2"), Some("2"));
        assert_eq!(ring.get("11"), Some("2"));
        assert_eq!(ring.get("23"), Some("4"));
        assert_eq!(ring.get("27"), Some("8"));
    }

    #[test]
    fn empty_rings_and_keys_yield_no_peer() {
        let mut ring = HashRing::default();
        assert_eq!(ring.is_empty(), true);
        assert_eq!(ring.get("Tom"), None);

        ring.add(&["peer1"]);
        assert_eq!(ring.get(""), None);
        assert_eq!(ring.get("Tom"), Some("peer1"));
        assert_eq!(ring.len(), DEFAULT_REPLICAS);
    }

    #[test]
    fn adding_the_same_peers_twice_is_idempotent() {
        let peers = ["alpha", "beta", "gamma"];
        let mut once = HashRing::new(10, None);
        once.add(&peers);
        let mut twice = HashRing::new(10, None);
        twice.add(&peers);
        twice.add(&peers);

        assert_eq!(once.len(), twice.len());
        for i in 0..500 {
            let key = format!("key-{}", i);
            assert_eq!(once.get(&key), twice.get(&key));
        }
        assert_eq!(twice.peers(), vec!["alpha", "beta", "gamma"]);
    }

    fn constant_hash(_data: &[u8]) -> u32 {
        42
    }

    #[test]
    fn colliding_nodes_do_not_depend_on_insertion_order() {
        let mut forward = HashRing::new(2, Some(constant_hash));
        forward.add(&["alpha", "beta"]);
        let mut backward = HashRing::new(2, Some(constant_hash));
        backward.add(&["beta"]);
        backward.add(&["alpha"]);

        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_eq!(forward.get("Tom"), Some("alpha"));
        assert_eq!(backward.get("Tom"), Some("alpha"));
    }

    #[test]
    fn keys_are_spread_across_all_peers() {
        let mut ring = HashRing::default();
        ring.add(&["alpha", "beta", "gamma"]);

        let mut counts = std::collections::HashMap::new();
        for i in 0..3000 {
            *counts
                .entry(ring.get(&format!("key-{}", i)).unwrap())
                .or_insert(0) += 1;
        }

        assert_eq!(counts.len(), 3);
        assert_eq!(counts.values().all(|count| *count > 200), true);
    }
}
