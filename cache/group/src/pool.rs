//! Transport-agnostic peer pool.
//!
//! [`PeerPool`] is the ownership half of a transport: it keeps the
//! consistent-hash ring and one [`PeerGetter`] per peer, and implements
//! [`PeerPicker`] by routing keys through the ring and comparing the
//! owner against the local identity. A transport supplies the getter
//! factory (e.g. one HTTP client per base URL) and calls
//! [`set_peers`](PeerPool::set_peers) when the member list changes.

use std::collections::HashMap;
use std::sync::Arc;

use bytestr::ByteStr;
use hash_ring::Ring;
use parking_lot::Mutex;

use crate::peer::{PeerGetter, PeerPicker};

type GetterFactory = Box<dyn Fn(&str) -> Arc<dyn PeerGetter> + Send + Sync>;

struct PoolState {
    ring: Ring,
    getters: HashMap<ByteStr, Arc<dyn PeerGetter>>,
}

/// Routes keys to peers through a consistent-hash ring.
///
/// Peer identities are URL-form strings compared by byte content. The
/// ring and getter table sit behind one mutex; the ring itself has no
/// interior locking.
pub struct PeerPool {
    self_id: String,
    replicas: usize,
    make_getter: GetterFactory,
    state: Mutex<PoolState>,
}

impl PeerPool {
    /// A pool for the node identified by `self_id`, constructing peer
    /// handles with `make_getter`. Starts with no peers: every key is
    /// owned locally until [`set_peers`](PeerPool::set_peers) runs.
    pub fn new(
        self_id: impl Into<String>,
        make_getter: impl Fn(&str) -> Arc<dyn PeerGetter> + Send + Sync + 'static,
    ) -> Self {
        Self {
            self_id: self_id.into(),
            replicas: hash_ring::DEFAULT_REPLICAS,
            make_getter: Box::new(make_getter),
            state: Mutex::new(PoolState {
                ring: Ring::new(),
                getters: HashMap::new(),
            }),
        }
    }

    /// This node's identity string.
    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    /// Replace the member set wholesale.
    ///
    /// Rebuilds the ring and the getter table from `peers`; the local
    /// identity may but need not appear in the list. There is no
    /// incremental membership change — this is the only mutation.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ring = Ring::builder().replicas(self.replicas).build();
        let mut getters = HashMap::new();
        for peer in peers {
            let peer = peer.as_ref();
            let id = ByteStr::from(peer.to_string());
            ring.add(&id);
            if peer != self.self_id {
                getters.insert(id, (self.make_getter)(peer));
            }
        }

        let mut state = self.state.lock();
        state.ring = ring;
        state.getters = getters;
    }
}

impl PeerPicker for PeerPool {
    fn pick(&self, key: &ByteStr) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.lock();
        let owner = state.ring.get(key.as_slice())?;
        if owner.as_slice() == self.self_id.as_bytes() {
            return None;
        }
        state.getters.get(&owner).cloned()
    }
}
