//! LRU map and synchronized byte-accounting cache.
//!
//! Two layers, matching how they are consumed:
//!
//! - [`Lru`]: a generic ordered map with a size cap and an evict hook.
//!   Entries live in a slot arena linked into a recency list (no raw
//!   pointers), most-recently-used at the head.
//! - [`SyncCache`]: an `Lru<ByteStr, ByteStr>` behind a mutex with
//!   relaxed atomic counters for bytes, gets, hits, and evictions.
//!
//! ```text
//! +----------------------------------------------+
//! |                 SyncCache                    |
//! |  Mutex<Lru<ByteStr, ByteStr>>                |
//! |  counters: nbytes / nget / nhit / nevict     |
//! +----------------------------------------------+
//!                      |
//!                      v
//! +----------------------------------------------+
//! |                    Lru                       |
//! |  HashMap<K, NodeId>    (index)               |
//! |  RecencyList<(K, V)>   (MRU ... LRU)         |
//! |  on_evict: FnMut(&K, &V)                     |
//! +----------------------------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod list;
mod lru;
mod sync;

pub use lru::{EvictCallback, Iter, Lru};
pub use sync::{CacheStats, SyncCache};
