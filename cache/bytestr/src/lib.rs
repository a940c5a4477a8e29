//! Shared immutable byte-string handle.
//!
//! [`ByteStr`] is the key and value currency of the cache crates: an
//! immutable byte sequence that is either a view into static program
//! memory or a reference-counted heap buffer.
//!
//! ```text
//! +--------------------------------------+
//! |               ByteStr                |
//! |                                      |
//! |  Static(&'static [u8])               |  clone/drop: no-op
//! |  Shared(Arc<[u8]>)                   |  clone: incref, drop: decref
//! +--------------------------------------+
//! ```
//!
//! Clones share storage; contents never mutate after construction, so
//! handles may cross thread boundaries freely. Equality, ordering, and
//! hashing are all by content, which makes `ByteStr` usable as a hash-map
//! key interchangeably with the byte slices it wraps.
//!
//! # Example
//!
//! ```
//! use bytestr::ByteStr;
//!
//! let a = ByteStr::from_static(b"hello");
//! let b = ByteStr::copy_from_slice(b"hello");
//! assert_eq!(a, b);
//! assert_eq!(a.ref_count(), None);      // static: not refcounted
//! assert_eq!(b.ref_count(), Some(1));
//!
//! let c = b.clone();
//! assert_eq!(b.ref_count(), Some(2));
//! drop(c);
//! assert_eq!(b.ref_count(), Some(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// An immutable, cheaply clonable byte string.
///
/// Either a non-owning view of static memory or a shared refcounted heap
/// buffer. See the [crate docs](crate) for the storage model.
#[derive(Clone)]
pub struct ByteStr {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Static(&'static [u8]),
    Shared {
        buf: Arc<[u8]>,
        // Live window into `buf`; whole buffer for freshly built handles,
        // narrowed by `slice`.
        start: usize,
        end: usize,
    },
}

impl ByteStr {
    /// Create a handle over static memory. No allocation, and clone/drop
    /// never touch a refcount.
    #[inline]
    pub const fn from_static(bytes: &'static [u8]) -> Self {
        Self {
            repr: Repr::Static(bytes),
        }
    }

    /// Create an owning handle by copying `bytes` into a fresh shared
    /// buffer.
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self::from_shared(Arc::from(bytes))
    }

    fn from_shared(buf: Arc<[u8]>) -> Self {
        let end = buf.len();
        Self {
            repr: Repr::Shared { buf, start: 0, end },
        }
    }

    /// Length of the byte string.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether the byte string is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// View the contents as a byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.repr {
            Repr::Static(s) => s,
            Repr::Shared { buf, start, end } => &buf[*start..*end],
        }
    }

    /// A sub-view of this handle sharing the same storage.
    ///
    /// No bytes are copied: an owned handle keeps a refcount on the full
    /// buffer, a static handle narrows its view. Panics when the range
    /// falls outside the handle, matching slice indexing.
    pub fn slice(&self, range: impl std::ops::RangeBounds<usize>) -> Self {
        use std::ops::Bound;

        let from = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n + 1,
            Bound::Unbounded => 0,
        };
        let to = match range.end_bound() {
            Bound::Included(&n) => n + 1,
            Bound::Excluded(&n) => n,
            Bound::Unbounded => self.len(),
        };
        assert!(
            from <= to && to <= self.len(),
            "slice {from}..{to} out of range for length {}",
            self.len()
        );

        match &self.repr {
            Repr::Static(s) => Self {
                repr: Repr::Static(&s[from..to]),
            },
            Repr::Shared { buf, start, .. } => Self {
                repr: Repr::Shared {
                    buf: Arc::clone(buf),
                    start: start + from,
                    end: start + to,
                },
            },
        }
    }

    /// Whether this handle is a static view (never refcounted).
    #[inline]
    pub fn is_static(&self) -> bool {
        matches!(self.repr, Repr::Static(_))
    }

    /// Current strong count of the shared buffer, or `None` for a static
    /// handle.
    ///
    /// Intended for tests and diagnostics; the count is a snapshot and
    /// may be stale by the time it is observed.
    pub fn ref_count(&self) -> Option<usize> {
        match &self.repr {
            Repr::Static(_) => None,
            Repr::Shared { buf, .. } => Some(Arc::strong_count(buf)),
        }
    }
}

impl Deref for ByteStr {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for ByteStr {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl Borrow<[u8]> for ByteStr {
    #[inline]
    fn borrow(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for ByteStr {
    /// Take ownership of the buffer without copying the contents again.
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_shared(Arc::from(bytes))
    }
}

impl From<String> for ByteStr {
    fn from(s: String) -> Self {
        Self::from(s.into_bytes())
    }
}

impl From<&'static str> for ByteStr {
    fn from(s: &'static str) -> Self {
        Self::from_static(s.as_bytes())
    }
}

impl PartialEq for ByteStr {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteStr {}

impl PartialEq<[u8]> for ByteStr {
    #[inline]
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

impl PartialEq<&[u8]> for ByteStr {
    #[inline]
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_slice() == *other
    }
}

impl PartialEq<str> for ByteStr {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_slice() == other.as_bytes()
    }
}

impl PartialEq<&str> for ByteStr {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_slice() == other.as_bytes()
    }
}

impl PartialOrd for ByteStr {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByteStr {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl Hash for ByteStr {
    /// Hashes by content, matching `<[u8] as Hash>` so that `ByteStr` and
    /// `[u8]` keys are interchangeable in hash maps.
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl fmt::Display for ByteStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_slice()))
    }
}

impl fmt::Debug for ByteStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b\"{}\"", String::from_utf8_lossy(self.as_slice()).escape_debug())
    }
}
