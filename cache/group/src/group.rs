//! The load orchestrator.

use bytestr::ByteStr;
use lru_cache::{CacheStats, SyncCache};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use singleflight::SingleFlight;

use crate::error::Error;
use crate::peer::{Getter, NoPeers, PeerGetter, PeerPicker, PeerRequest};
use crate::stats::GroupStats;
use crate::StatsSnapshot;

use std::sync::atomic::Ordering::Relaxed;

/// Selects one of a group's two caches in [`Group::cache_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Entries this node loaded authoritatively.
    Main,
    /// Popular entries fetched from peers.
    Hot,
}

/// A named, read-through cache shard.
///
/// A `Group` answers `get` from its two caches when it can, and
/// otherwise runs exactly one load per key at a time: keys owned by a
/// peer are fetched remotely, keys owned here go through the local
/// [`Getter`]. Loaded values populate the main cache (local loads) or,
/// for one remote fetch in ten, the hot cache; both caches evict LRU
/// entries against one shared byte budget.
///
/// All methods are safe to call concurrently; work runs on caller
/// threads.
///
/// # Example
///
/// ```
/// use bytestr::ByteStr;
/// use group_cache::{BoxError, Group};
///
/// let group = Group::builder("lookups")
///     .getter(|key: &ByteStr| -> Result<ByteStr, BoxError> {
///         Ok(ByteStr::from(format!("value for {key}")))
///     })
///     .cache_bytes(64 << 20)
///     .build()
///     .unwrap();
///
/// let value = group.get(&ByteStr::from_static(b"answer")).unwrap();
/// assert_eq!(value, "value for answer");
/// ```
pub struct Group {
    name: String,
    getter: Box<dyn Getter>,
    peers: Box<dyn PeerPicker>,
    cache_bytes: u64,
    main_cache: SyncCache,
    hot_cache: SyncCache,
    flight: SingleFlight<ByteStr, ByteStr, Error>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    stats: GroupStats,
}

impl Group {
    /// Start building a group named `name`. The name doubles as the
    /// routing path segment transports use on the wire.
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder {
            name: name.into(),
            getter: None,
            peers: None,
            cache_bytes: 0,
            rng: None,
        }
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch the value for `key`.
    ///
    /// Cache hit or single load, in that order; see the type docs for
    /// the pipeline. Errors are loader failures only — peer failures
    /// fall back to the loader and are reported through
    /// [`stats`](Group::stats) instead.
    pub fn get(&self, key: &ByteStr) -> Result<ByteStr, Error> {
        self.stats.gets.fetch_add(1, Relaxed);
        if let Some(value) = self.lookup_cache(key) {
            self.stats.cache_hits.fetch_add(1, Relaxed);
            return Ok(value);
        }
        self.load(key)
    }

    /// Counter snapshot for this group.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Counter snapshot for one of the group's caches.
    pub fn cache_stats(&self, kind: CacheKind) -> CacheStats {
        match kind {
            CacheKind::Main => self.main_cache.stats(),
            CacheKind::Hot => self.hot_cache.stats(),
        }
    }

    fn lookup_cache(&self, key: &ByteStr) -> Option<ByteStr> {
        if self.cache_bytes == 0 {
            return None;
        }
        self.main_cache
            .get(key)
            .or_else(|| self.hot_cache.get(key))
    }

    fn load(&self, key: &ByteStr) -> Result<ByteStr, Error> {
        self.stats.loads.fetch_add(1, Relaxed);
        self.flight.run(key, || self.load_once(key))
    }

    /// The deduplicated load body; runs at most once concurrently per
    /// key.
    fn load_once(&self, key: &ByteStr) -> Result<ByteStr, Error> {
        // A waiter that lost the race to lead may find the value already
        // populated by the previous flight.
        if let Some(value) = self.lookup_cache(key) {
            self.stats.cache_hits.fetch_add(1, Relaxed);
            return Ok(value);
        }
        self.stats.loads_deduped.fetch_add(1, Relaxed);

        if let Some(peer) = self.peers.pick(key) {
            match self.get_from_peer(peer.as_ref(), key) {
                Ok(value) => {
                    self.stats.peer_loads.fetch_add(1, Relaxed);
                    if self.roll_hot_promotion() {
                        self.populate(&self.hot_cache, key, &value);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    tracing::warn!(
                        group = %self.name,
                        peer = peer.name(),
                        error = %err,
                        "peer load failed, falling back to local loader"
                    );
                    self.stats.peer_errors.fetch_add(1, Relaxed);
                }
            }
        }

        match self.getter.get(key) {
            Ok(value) => {
                self.stats.local_loads.fetch_add(1, Relaxed);
                self.populate(&self.main_cache, key, &value);
                Ok(value)
            }
            Err(err) => {
                self.stats.local_load_errs.fetch_add(1, Relaxed);
                Err(Error::loader(err))
            }
        }
    }

    fn get_from_peer(&self, peer: &dyn PeerGetter, key: &ByteStr) -> Result<ByteStr, Error> {
        let request = PeerRequest {
            group: &self.name,
            key: key.as_slice(),
        };
        let response = peer.get(&request).map_err(Error::transport)?;
        let value = response.value.ok_or(Error::MissingPeerValue)?;
        Ok(ByteStr::from(Vec::from(value)))
    }

    /// One remote fetch in ten is kept in the hot cache.
    fn roll_hot_promotion(&self) -> bool {
        let mut rng = self.rng.lock();
        rng.gen_range(0..10u32) == 0
    }

    /// Insert into `cache`, then evict across both caches until the
    /// combined footprint is back under the byte budget.
    fn populate(&self, cache: &SyncCache, key: &ByteStr, value: &ByteStr) {
        if self.cache_bytes == 0 {
            return;
        }
        cache.add(key, value);

        loop {
            let main_bytes = self.main_cache.bytes();
            let hot_bytes = self.hot_cache.bytes();
            if main_bytes + hot_bytes < self.cache_bytes {
                return;
            }

            // The hot cache is the victim once it outgrows an eighth of
            // the main cache.
            let victim = if hot_bytes > main_bytes / 8 {
                &self.hot_cache
            } else {
                &self.main_cache
            };
            if !victim.remove_oldest() {
                return;
            }
        }
    }
}

/// Configures and builds a [`Group`]. Created by [`Group::builder`].
pub struct GroupBuilder {
    name: String,
    getter: Option<Box<dyn Getter>>,
    peers: Option<Box<dyn PeerPicker>>,
    cache_bytes: u64,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl GroupBuilder {
    /// The local authoritative loader. Required.
    pub fn getter(mut self, getter: impl Getter + 'static) -> Self {
        self.getter = Some(Box::new(getter));
        self
    }

    /// The peer picker. Defaults to [`NoPeers`] (single-node operation).
    pub fn peers(mut self, peers: impl PeerPicker + 'static) -> Self {
        self.peers = Some(Box::new(peers));
        self
    }

    /// Byte budget shared by the main and hot caches. 0 (the default)
    /// disables caching entirely: no lookups, no inserts.
    pub fn cache_bytes(mut self, bytes: u64) -> Self {
        self.cache_bytes = bytes;
        self
    }

    /// Random source for hot-cache promotion decisions. Defaults to a
    /// thread-seeded [`SmallRng`]; tests inject a seeded source to pin
    /// the promotion pattern.
    pub fn rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Build the group.
    pub fn build(self) -> Result<Group, Error> {
        let getter = self
            .getter
            .ok_or(Error::Config("a group requires a getter"))?;
        let peers = self
            .peers
            .unwrap_or_else(|| Box::new(NoPeers));
        let rng: Box<dyn RngCore + Send> = match self.rng {
            Some(rng) => rng,
            None => Box::new(SmallRng::from_entropy()),
        };

        Ok(Group {
            name: self.name,
            getter,
            peers,
            cache_bytes: self.cache_bytes,
            main_cache: SyncCache::new(),
            hot_cache: SyncCache::new(),
            flight: SingleFlight::new(),
            rng: Mutex::new(rng),
            stats: GroupStats::default(),
        })
    }
}
