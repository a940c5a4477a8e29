//! Read-through cache groups with peer ownership.
//!
//! A [`Group`] is a named namespace of keys in front of an authoritative
//! loader. Nodes running the same groups form a peer set; consistent
//! hashing gives every key exactly one owning node, and a node asked for
//! a key it does not own fetches it from the owner instead of loading it
//! locally. Each node keeps two caches under one byte budget — *main*
//! for values it loaded authoritatively, *hot* for popular remote values
//! — and collapses concurrent loads of the same key into a single
//! flight.
//!
//! # Get pipeline
//!
//! ```text
//!  get(key)
//!    |
//!    v
//!  main cache? -- hit --> clone
//!  hot cache?  -- hit --> clone
//!    |
//!    v miss
//!  single-flight (one load per key) ----------------------+
//!    |                                                    |
//!    v                                                    |
//!  re-check caches, then pick owner                       |
//!    |-- peer owns --> peer.get --> (1/10: hot cache)     |
//!    |       \-- error: log, count, fall through          |
//!    `-- we own  --> getter.get --> main cache            |
//!                                                         |
//!  evict LRU across main+hot until under budget  <--------+
//! ```
//!
//! # Collaborators
//!
//! The transport (HTTP or otherwise) stays outside this crate behind
//! three seams: [`Getter`] (local loads), [`PeerPicker`]/[`PeerGetter`]
//! (remote loads), and the [`registry`] (name-based routing for inbound
//! requests). [`PeerPool`] supplies the standard picker: a
//! consistent-hash ring plus one getter per peer.
//!
//! # Example
//!
//! ```
//! use bytestr::ByteStr;
//! use group_cache::{BoxError, Group};
//!
//! let group = Group::builder("users")
//!     .getter(|key: &ByteStr| -> Result<ByteStr, BoxError> {
//!         // Query the authoritative store here.
//!         Ok(ByteStr::from(format!("row:{key}")))
//!     })
//!     .cache_bytes(64 << 20)
//!     .build()?;
//!
//! assert_eq!(group.get(&ByteStr::from_static(b"alice"))?, "row:alice");
//! # Ok::<(), group_cache::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod group;
mod peer;
mod pool;
pub mod registry;
mod stats;

pub use error::{BoxError, Error};
pub use group::{CacheKind, Group, GroupBuilder};
pub use peer::{Getter, NoPeers, PeerGetter, PeerPicker, PeerRequest, PeerResponse};
pub use pool::PeerPool;
pub use stats::StatsSnapshot;

// The handle and cache-stat types appear throughout the public API;
// re-exported so embedders need only this crate.
pub use bytestr::ByteStr;
pub use lru_cache::CacheStats;
