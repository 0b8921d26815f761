//! Defines the errors which are reported to callers of [Group::get](crate::group::Group::get).
//!
//! Only two kinds of errors ever reach a caller: an invalid (empty) key or a failure of the
//! origin loader. Failures of peers are handled internally (see
//! [PeerError](crate::peers::PeerError)), as the origin loader is always used as fallback.
use thiserror::Error;

/// Enumerates the errors reported by a [Group](crate::group::Group).
#[derive(Error, Debug)]
pub enum CacheError {
    /// An empty key has been requested.
    #[error("Cannot perform a lookup for an empty key.")]
    InvalidKey,

    /// The origin loader failed to provide a value.
    #[error("Failed to load '{key}' for group '{group}': {source}")]
    OriginLoad {
        /// Contains the name of the group which performed the load.
        group: String,
        /// Contains the requested key.
        key: String,
        /// Contains the error reported by the loader.
        #[source]
        source: anyhow::Error,
    },
}
