//! Three cache nodes in one process.
//!
//! Each node owns a `Group` and a `PeerPool`; the "transport" between
//! them is a direct call into the target node's group. Keys hash to one
//! owning node, so a get on any node either answers locally or hops to
//! the owner exactly once.
//!
//! Run with: cargo run -p group-cache --example cluster

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use bytestr::ByteStr;
use group_cache::{BoxError, Group, PeerGetter, PeerPool, PeerRequest, PeerResponse};
use parking_lot::RwLock;
use tracing_subscriber::EnvFilter;

type NodeMap = Arc<RwLock<HashMap<String, Arc<Group>>>>;

/// In-process stand-in for a transport client: fetches by calling the
/// target node's group directly.
struct LoopbackPeer {
    addr: String,
    nodes: NodeMap,
}

impl PeerGetter for LoopbackPeer {
    fn get(&self, request: &PeerRequest<'_>) -> Result<PeerResponse, BoxError> {
        let target = self
            .nodes
            .read()
            .get(&self.addr)
            .cloned()
            .ok_or_else(|| format!("unknown peer {}", self.addr))?;
        let value = target.get(&ByteStr::copy_from_slice(request.key))?;
        Ok(PeerResponse {
            value: Some(Bytes::copy_from_slice(&value)),
            minute_qps: 0.0,
        })
    }

    fn name(&self) -> &str {
        &self.addr
    }
}

fn make_node(addr: &str, members: &[&str], nodes: NodeMap) -> Arc<Group> {
    let pool = PeerPool::new(addr, {
        let nodes = Arc::clone(&nodes);
        move |peer: &str| {
            Arc::new(LoopbackPeer {
                addr: peer.to_string(),
                nodes: Arc::clone(&nodes),
            }) as Arc<dyn PeerGetter>
        }
    });
    pool.set_peers(members.iter().copied());

    let owner = addr.to_string();
    Arc::new(
        Group::builder("kv")
            .getter(move |key: &ByteStr| -> Result<ByteStr, BoxError> {
                tracing::info!(node = %owner, key = %key, "authoritative load");
                Ok(ByteStr::from(format!("{owner} loaded {key}")))
            })
            .peers(pool)
            .cache_bytes(1 << 20)
            .build()
            .expect("group config"),
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let members = ["node://a", "node://b", "node://c"];
    let nodes: NodeMap = Arc::new(RwLock::new(HashMap::new()));
    for addr in members {
        let node = make_node(addr, &members, Arc::clone(&nodes));
        nodes.write().insert(addr.to_string(), node);
    }

    // Every request goes to node a; keys owned elsewhere hop once.
    let entry = nodes.read().get("node://a").cloned().unwrap();
    for i in 0..8 {
        let key = ByteStr::from(format!("user:{i}"));
        let value = entry.get(&key).expect("get");
        println!("{key} -> {value}");
    }

    // Cached on the second pass: no more authoritative loads.
    for i in 0..8 {
        let key = ByteStr::from(format!("user:{i}"));
        entry.get(&key).expect("get");
    }

    let stats = entry.stats();
    println!(
        "node a: gets={} hits={} local={} peer={} deduped={}",
        stats.gets, stats.cache_hits, stats.local_loads, stats.peer_loads, stats.loads_deduped,
    );
}
