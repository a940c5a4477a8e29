//! Contracts between the orchestrator and its collaborators.
//!
//! A [`Group`](crate::Group) loads through two seams: a [`Getter`] for
//! keys this node owns, and a [`PeerPicker`]/[`PeerGetter`] pair for keys
//! owned elsewhere. Transports implement the peer side; the orchestrator
//! never sees a socket.

use std::sync::Arc;

use bytes::Bytes;
use bytestr::ByteStr;

use crate::error::BoxError;

/// The authoritative local source of values.
///
/// Called at most once concurrently per key (loads are deduplicated
/// upstream). The returned handle is taken by the orchestrator; the
/// loader must not retain it.
pub trait Getter: Send + Sync {
    /// Load the value for `key`.
    fn get(&self, key: &ByteStr) -> Result<ByteStr, BoxError>;
}

impl<F> Getter for F
where
    F: Fn(&ByteStr) -> Result<ByteStr, BoxError> + Send + Sync,
{
    fn get(&self, key: &ByteStr) -> Result<ByteStr, BoxError> {
        self(key)
    }
}

/// A fetch request addressed to the peer that owns a key.
#[derive(Debug, Clone, Copy)]
pub struct PeerRequest<'a> {
    /// Group name; doubles as the path segment on the wire.
    pub group: &'a str,
    /// The key being fetched.
    pub key: &'a [u8],
}

/// A peer's answer to a [`PeerRequest`].
///
/// Field-for-field the established groupcache response envelope; the
/// wire codec lives in the transport.
#[derive(Debug, Clone, Default)]
pub struct PeerResponse {
    /// The value bytes; absent surfaces as
    /// [`Error::MissingPeerValue`](crate::Error::MissingPeerValue).
    pub value: Option<Bytes>,
    /// The owner's recent per-minute request rate for this key. Carried
    /// for envelope compatibility; unused by the orchestrator.
    pub minute_qps: f64,
}

/// Handle for fetching from one remote peer.
pub trait PeerGetter: Send + Sync {
    /// Fetch a value from the peer.
    fn get(&self, request: &PeerRequest<'_>) -> Result<PeerResponse, BoxError>;

    /// Stable identity of the peer (URL form), used for logging and
    /// routing equality.
    fn name(&self) -> &str;
}

/// Routes keys to their owning peer.
pub trait PeerPicker: Send + Sync {
    /// The peer that owns `key`, or `None` when this node owns it.
    fn pick(&self, key: &ByteStr) -> Option<Arc<dyn PeerGetter>>;
}

/// A picker for single-node operation: every key is owned locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPeers;

impl PeerPicker for NoPeers {
    fn pick(&self, _key: &ByteStr) -> Option<Arc<dyn PeerGetter>> {
        None
    }
}
