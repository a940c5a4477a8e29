//! Per-key call deduplication.
//!
//! [`SingleFlight::run`] guarantees that for any key, at most one caller
//! executes the task at a time; every concurrent caller for the same key
//! blocks until the leader finishes and then receives a clone of the
//! same result. Callers that arrive after the leader has finished start
//! a fresh flight.
//!
//! ```text
//!   caller A ---- run(k) ----> leader: executes task, stores result,
//!                              notifies, removes the in-flight entry
//!   caller B ---- run(k) ----> waiter: cond.wait until the result slot
//!   caller C ---- run(k) ----> waiter: fills, then clones it
//! ```
//!
//! The task runs outside every lock, so it may block (network, disk)
//! without holding up unrelated keys. Results and errors are shared by
//! cloning, which is why both must be `Clone`; refcounted handles make
//! the clone cheap.
//!
//! # Example
//!
//! ```
//! use singleflight::SingleFlight;
//!
//! let flight: SingleFlight<String, String, String> = SingleFlight::new();
//! let value = flight
//!     .run(&"key".to_string(), || Ok("value".to_string()))
//!     .unwrap();
//! assert_eq!(value, "value");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// A single in-flight call: the shared result slot and the monitor the
/// waiters sleep on.
///
/// The `Arc` wrapping each call plays the waits-counter role: the last
/// holder (leader or waiter) to drop its handle frees the call.
struct Call<V, E> {
    result: Mutex<Option<Result<V, E>>>,
    done: Condvar,
}

impl<V, E> Call<V, E> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }
}

type CallTable<K, V, E> = Mutex<std::collections::HashMap<K, Arc<Call<V, E>>, ahash::RandomState>>;

/// Deduplicates concurrent calls per key. See the [crate docs](crate).
pub struct SingleFlight<K, V, E> {
    calls: CallTable<K, V, E>,
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    /// Create an empty flight table.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(std::collections::HashMap::default()),
        }
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    /// Detach `key` from its in-flight call, if any.
    ///
    /// The next `run` for the key starts a fresh flight instead of
    /// waiting; callers already waiting still receive the detached
    /// call's result. Useful when the caller knows an in-flight result
    /// will be stale (say, after an upstream write).
    pub fn forget(&self, key: &K) {
        self.calls.lock().remove(key);
    }

    /// Run `task` for `key`, or wait for the caller already running it.
    ///
    /// At most one thread executes `task` for a given key at any
    /// instant. Every waiter receives a clone of the leader's result,
    /// error included. The key is only cloned when this caller becomes
    /// the leader; no reference to it outlives the call.
    pub fn run<F>(&self, key: &K, task: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let (call, leader) = {
            let mut calls = self.calls.lock();
            match calls.get(key) {
                Some(call) => (Arc::clone(call), false),
                None => {
                    let call = Arc::new(Call::new());
                    calls.insert(key.clone(), Arc::clone(&call));
                    (call, true)
                }
            }
        };

        if leader {
            // Run outside every lock so unrelated keys proceed and
            // waiters can park on the monitor.
            let result = task();
            {
                let mut slot = call.result.lock();
                *slot = Some(result.clone());
                call.done.notify_all();
            }
            // Remove only our own call: `forget` may already have
            // detached it and let a successor flight take the key.
            {
                let mut calls = self.calls.lock();
                if calls.get(key).is_some_and(|current| Arc::ptr_eq(current, &call)) {
                    calls.remove(key);
                }
            }
            result
        } else {
            let mut slot = call.result.lock();
            loop {
                if let Some(result) = slot.as_ref() {
                    return result.clone();
                }
                // The monitor pattern: spurious wakeups loop back to the
                // result check.
                call.done.wait(&mut slot);
            }
        }
    }
}

impl<K, V, E> Default for SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
