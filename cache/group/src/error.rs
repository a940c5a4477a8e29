//! Error types for group operations.

use std::sync::Arc;

/// Boxed error returned by loader and peer-getter implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`Group::get`](crate::Group::get) and the peer
/// fetch path.
///
/// `Clone` because a single load's outcome is shared with every
/// single-flight waiter; sources are held behind `Arc` to keep the clone
/// cheap.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The local loader failed. Surfaced to the caller after the peer
    /// path (if any) has already been exhausted.
    #[error("loader error: {0}")]
    Loader(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A peer answered but the response carried no value field.
    #[error("peer response missing value")]
    MissingPeerValue,

    /// Transport-level failure while fetching from a peer. Never fatal
    /// for a `get`: the orchestrator logs it, counts it, and falls back
    /// to the local loader.
    #[error("peer transport error: {0}")]
    PeerTransport(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// Invalid builder configuration.
    #[error("configuration error: {0}")]
    Config(&'static str),
}

impl Error {
    /// Wrap a loader failure.
    pub fn loader(err: BoxError) -> Self {
        Self::Loader(Arc::from(err))
    }

    /// Wrap a peer transport failure.
    pub fn transport(err: BoxError) -> Self {
        Self::PeerTransport(Arc::from(err))
    }
}
