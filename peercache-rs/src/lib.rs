//! Peercache is an embeddable read-through cache which shares hot keys across a cluster of
//! identical worker processes.
//!
//! # Introduction
//! Many applications compute values which are expensive to produce (rendered results, computed
//! scores, derived blobs) and which are requested over and over again by all of their worker
//! processes. **Peercache** wraps such a key space into a named [Group](group::Group) which keeps
//! a size constrained LRU cache of recently used values. Each key is owned by exactly one process
//! of the cluster, determined via a consistent hash ring. Therefore a process asks the owning
//! peer for a value before it falls back to loading it from the origin itself.
//!
//! The lookup of a value therefore takes the following path:
//! local cache hit → value from the owning peer → value from the origin loader (which is then
//! put into the local cache).
//!
//! # Modules
//! * **LRU-Cache**: A memory constrained cache which evicts the least recently used entries
//!   once it is full. See [crate::lru] and its thread safe wrapper [crate::cache].
//! * **Consistent Hashing**: A hash ring with virtual nodes which deterministically maps keys to
//!   peers. See [crate::consistenthash] and the [RingPicker](peers::RingPicker).
//! * **Groups**: The actual read-through orchestration. See [crate::group] and
//!   [crate::registry].
//!
//! Note that the transport used to talk to other peers is not part of this crate. It has to be
//! provided by implementing [PeerGetter](peers::PeerGetter).
//!
//! # Examples
//! ```
//! # use std::sync::Arc;
//! # use peercache::group::GetterFunc;
//! # use peercache::registry::Registry;
//! #[tokio::main]
//! async fn main() {
//!     peercache::init_logging();
//!
//!     let registry = Registry::new();
//!     let scores = registry.new_group(
//!         "scores",
//!         2048,
//!         Arc::new(GetterFunc::new(|key| Ok(format!("score of {}", key).into_bytes()))),
//!     );
//!
//!     assert_eq!(scores.get("Tom").await.unwrap().to_string(), "score of Tom");
//! }
//! ```
#![deny(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_results
)]
use simplelog::{format_description, ConfigBuilder, LevelFilter, SimpleLogger};
use std::sync::Once;

pub mod average;
pub mod byteview;
pub mod cache;
pub mod config;
pub mod consistenthash;
pub mod error;
pub mod fmt;
pub mod group;
pub mod lru;
pub mod peers;
pub mod registry;

/// Contains the version of the Peercache library.
pub const PEERCACHE_VERSION: &str = "DEVELOPMENT-SNAPSHOT";

/// Initializes the logging system.
///
/// Applications which already set up a logger can skip this, as all messages are emitted via
/// the **log** facade.
pub fn init_logging() {
    static INIT_LOGGING: Once = Once::new();

    // We need to do this as otherwise the tests might crash as the logging system
    // is initialized several times...
    INIT_LOGGING.call_once(|| {
        if let Err(error) = SimpleLogger::init(
            LevelFilter::Debug,
            ConfigBuilder::new()
                .set_time_format_custom(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
                ))
                .set_thread_level(LevelFilter::Trace)
                .set_target_level(LevelFilter::Error)
                .set_location_level(LevelFilter::Trace)
                .build(),
        ) {
            panic!("Failed to initialize logging system: {}", error);
        }
    });
}
