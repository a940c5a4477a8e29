//! Group-level statistics.
//!
//! Monotonic counters incremented with relaxed ordering; readers get a
//! point-in-time copy per counter but no consistent cross-counter
//! snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters owned by a [`Group`](crate::Group).
#[derive(Debug, Default)]
pub(crate) struct GroupStats {
    pub(crate) gets: AtomicU64,
    pub(crate) cache_hits: AtomicU64,
    pub(crate) loads: AtomicU64,
    pub(crate) loads_deduped: AtomicU64,
    pub(crate) peer_loads: AtomicU64,
    pub(crate) peer_errors: AtomicU64,
    pub(crate) local_loads: AtomicU64,
    pub(crate) local_load_errs: AtomicU64,
}

impl GroupStats {
    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            loads_deduped: self.loads_deduped.load(Ordering::Relaxed),
            peer_loads: self.peer_loads.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            local_loads: self.local_loads.load(Ordering::Relaxed),
            local_load_errs: self.local_load_errs.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a group's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// `get` calls.
    pub gets: u64,
    /// `get` calls answered from either cache.
    pub cache_hits: u64,
    /// `get` calls that went through the load path.
    pub loads: u64,
    /// Loads that actually ran after single-flight deduplication.
    pub loads_deduped: u64,
    /// Values fetched from the owning peer.
    pub peer_loads: u64,
    /// Failed peer fetches (each falls back to the local loader).
    pub peer_errors: u64,
    /// Values loaded from the local getter.
    pub local_loads: u64,
    /// Local loader failures surfaced to callers.
    pub local_load_errs: u64,
}
