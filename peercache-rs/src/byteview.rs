//! Provides an immutable view on cached bytes.
//!
//! A [ByteView] is what a [Group](crate::group::Group) hands out to its callers. It is backed by
//! a reference counted buffer, therefore cloning a view is cheap and all clones share the same
//! data. As the buffer can never be modified, a caller can not tamper with the cached contents:
//! [ByteView::byte_slice] always returns a fresh copy.
//!
//! # Examples
//!
//! ```
//! # use peercache::byteview::ByteView;
//! let view = ByteView::from("630");
//! assert_eq!(view.len(), 3);
//! assert_eq!(view.to_string(), "630");
//!
//! // Modifying the copy leaves the view untouched...
//! let mut copy = view.byte_slice();
//! copy[0] = b'9';
//! assert_eq!(view.to_string(), "630");
//! ```
use std::fmt;
use std::fmt::Display;

use bytes::Bytes;

use crate::lru::ByteSize;

/// Represents an immutable, copy-on-read snapshot of a cached value.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    data: Bytes,
}

impl ByteView {
    /// Creates a view which owns a private copy of the given bytes.
    ///
    /// This is used when accepting data from an origin loader, as we never want to share a buffer
    /// with code outside of the cache.
    pub fn copy_from(data: &[u8]) -> Self {
        ByteView {
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Returns the number of bytes in this view.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Determines if the view contains no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a copy of the underlying data.
    ///
    /// Each call allocates a new vector, so that the cached data itself can never be modified.
    pub fn byte_slice(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl ByteSize for ByteView {
    fn allocated_size(&self) -> usize {
        self.data.len()
    }
}

impl Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.data))
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteView({:?})", String::from_utf8_lossy(&self.data))
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(data: Vec<u8>) -> Self {
        ByteView {
            data: Bytes::from(data),
        }
    }
}

impl From<&[u8]> for ByteView {
    fn from(data: &[u8]) -> Self {
        ByteView::copy_from(data)
    }
}

impl From<String> for ByteView {
    fn from(data: String) -> Self {
        ByteView::from(data.into_bytes())
    }
}

impl From<&str> for ByteView {
    fn from(data: &str) -> Self {
        ByteView::copy_from(data.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use crate::byteview::ByteView;
    use crate::lru::ByteSize;

    #[test]
    fn byte_slice_returns_a_defensive_copy() {
        let view = ByteView::from("Hello");

        let mut first = view.byte_slice();
        first.clear();

        assert_eq!(view.byte_slice(), b"Hello".to_vec());
        assert_eq!(view.len(), 5);
    }

    #[test]
    fn copy_from_detaches_from_the_source() {
        let mut source = b"World".to_vec();
        let view = ByteView::copy_from(&source);
        source[0] = b'w';

        assert_eq!(view.to_string(), "World");
    }

    #[test]
    fn size_is_the_number_of_bytes() {
        assert_eq!(ByteView::from("").allocated_size(), 0);
        assert_eq!(ByteView::from("").is_empty(), true);
        assert_eq!(ByteView::from(vec![1, 2, 3]).allocated_size(), 3);
    }

    #[test]
    fn clones_share_the_same_contents() {
        let view = ByteView::from("630".to_owned());
        let clone = view.clone();

        assert_eq!(view, clone);
        assert_eq!(format!("{:?}", clone), "ByteView(\"630\")");
    }
}
