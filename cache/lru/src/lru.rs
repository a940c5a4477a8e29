//! Generic LRU map with a size cap and an evict hook.

use std::hash::Hash;

use crate::list::{NodeId, RecencyList};

type Index<K> = std::collections::HashMap<K, NodeId, ahash::RandomState>;

/// Callback invoked with each entry as it leaves the cache.
///
/// Runs exactly once per removed entry (capacity eviction, explicit
/// removal, clear, or drop), before the entry's storage is reused. Must
/// not re-enter the owning cache.
pub type EvictCallback<K, V> = Box<dyn FnMut(&K, &V) + Send>;

/// An ordered map that evicts its least recently used entry past a size
/// cap.
///
/// Every entry is reachable from both the hash index and the recency
/// list; the list order reflects last touch with the most recent at the
/// head.
pub struct Lru<K, V> {
    max_entries: usize,
    index: Index<K>,
    list: RecencyList<(K, V)>,
    on_evict: Option<EvictCallback<K, V>>,
}

impl<K: Eq + Hash + Clone, V> Lru<K, V> {
    /// Create a cache holding at most `max_entries` entries; 0 means
    /// unbounded.
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            index: Index::default(),
            list: RecencyList::new(),
            on_evict: None,
        }
    }

    /// Create a cache with an evict hook.
    pub fn with_evict(max_entries: usize, on_evict: EvictCallback<K, V>) -> Self {
        Self {
            max_entries,
            index: Index::default(),
            list: RecencyList::new(),
            on_evict: Some(on_evict),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Insert or replace `key`'s value, promoting it to most recent.
    ///
    /// Returns the previous value when the key was already present. A
    /// replaced value is handed back rather than run through the evict
    /// hook. Inserting past `max_entries` evicts the least recently used
    /// entry.
    pub fn add(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&id) = self.index.get(&key) {
            self.list.move_to_front(id);
            let entry = self.list.get_mut(id);
            return Some(std::mem::replace(&mut entry.1, value));
        }

        let id = self.list.push_front((key.clone(), value));
        self.index.insert(key, id);

        if self.max_entries > 0 && self.list.len() > self.max_entries {
            self.remove_oldest();
        }
        None
    }

    /// Look up `key`, promoting it to most recent on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let &id = self.index.get(key)?;
        self.list.move_to_front(id);
        Some(&self.list.get(id).1)
    }

    /// Remove `key` if present, running the evict hook. Returns whether
    /// an entry was removed.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(id) => {
                let (k, v) = self.list.remove(id);
                self.evict(&k, &v);
                true
            }
            None => false,
        }
    }

    /// Remove the least recently used entry, running the evict hook.
    /// Returns whether an entry was removed.
    pub fn remove_oldest(&mut self) -> bool {
        match self.list.pop_back() {
            Some((k, v)) => {
                self.index.remove(&k);
                self.evict(&k, &v);
                true
            }
            None => false,
        }
    }

    /// Iterate entries from most to least recently used.
    ///
    /// The borrow pins the cache for the iterator's lifetime; callers
    /// needing a stable view across mutation must synchronize externally.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.list.iter(),
        }
    }

    /// Remove every entry, running the evict hook for each.
    pub fn clear(&mut self) {
        while let Some((k, v)) = self.list.pop_back() {
            self.index.remove(&k);
            self.evict(&k, &v);
        }
    }

    fn evict(&mut self, key: &K, value: &V) {
        if let Some(hook) = &mut self.on_evict {
            hook(key, value);
        }
    }
}

impl<K, V> Drop for Lru<K, V> {
    fn drop(&mut self) {
        // Teardown counts as eviction: surviving entries go through the
        // hook before their storage is dropped. The index needs no
        // maintenance here; it is dropped with us.
        if let Some(hook) = &mut self.on_evict {
            while let Some((k, v)) = self.list.pop_back() {
                hook(&k, &v);
            }
        }
    }
}

/// Iterator over entries from MRU to LRU. See [`Lru::iter`].
pub struct Iter<'a, K, V> {
    inner: crate::list::ListIter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        self.inner.next().map(|(k, v)| (k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn keys(lru: &Lru<&'static str, u32>) -> Vec<&'static str> {
        lru.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_add_get() {
        let mut lru = Lru::new(0);
        assert_eq!(lru.add("a", 1), None);
        assert_eq!(lru.get(&"a"), Some(&1));
        assert_eq!(lru.get(&"missing"), None);
    }

    #[test]
    fn test_add_replace_returns_old() {
        let mut lru = Lru::new(0);
        lru.add("a", 1);
        assert_eq!(lru.add("a", 2), Some(1));
        assert_eq!(lru.get(&"a"), Some(&2));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_capacity_eviction_order() {
        // add(a); add(b); get(a); add(c) with capacity 2 keeps {a, c}.
        let mut lru = Lru::new(2);
        lru.add("a", 1);
        lru.add("b", 2);
        assert_eq!(lru.get(&"a"), Some(&1));
        lru.add("c", 3);

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.get(&"b"), None);
        assert_eq!(lru.get(&"a"), Some(&1));
        assert_eq!(lru.get(&"c"), Some(&3));
    }

    #[test]
    fn test_iter_mru_to_lru() {
        let mut lru = Lru::new(0);
        lru.add("a", 1);
        lru.add("b", 2);
        lru.add("c", 3);
        assert_eq!(keys(&lru), vec!["c", "b", "a"]);

        lru.get(&"a");
        assert_eq!(keys(&lru), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_remove() {
        let mut lru = Lru::new(0);
        lru.add("a", 1);
        assert!(lru.remove(&"a"));
        assert!(!lru.remove(&"a"));
        assert!(lru.is_empty());
    }

    #[test]
    fn test_remove_oldest() {
        let mut lru = Lru::new(0);
        lru.add("a", 1);
        lru.add("b", 2);
        lru.remove_oldest();
        assert_eq!(lru.get(&"a"), None);
        assert_eq!(lru.get(&"b"), Some(&2));

        // No-op when empty.
        lru.remove_oldest();
        lru.remove_oldest();
        assert!(lru.is_empty());
    }

    #[test]
    fn test_evict_hook_runs_once_per_removal() {
        let evicted = Arc::new(AtomicUsize::new(0));
        let counter = evicted.clone();
        let mut lru: Lru<&str, u32> = Lru::with_evict(
            2,
            Box::new(move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        );

        lru.add("a", 1);
        lru.add("b", 2);
        lru.add("c", 3); // evicts a
        assert_eq!(evicted.load(Ordering::Relaxed), 1);

        lru.remove(&"b");
        assert_eq!(evicted.load(Ordering::Relaxed), 2);

        // Replace does not evict.
        lru.add("c", 4);
        assert_eq!(evicted.load(Ordering::Relaxed), 2);

        lru.remove_oldest(); // c
        assert_eq!(evicted.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_evict_hook_sees_entry() {
        let seen: Arc<parking_lot::Mutex<Vec<(String, u32)>>> =
            Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut lru: Lru<String, u32> = Lru::with_evict(
            1,
            Box::new(move |k, v| {
                sink.lock().push((k.clone(), *v));
            }),
        );

        lru.add("a".to_string(), 1);
        lru.add("b".to_string(), 2);
        assert_eq!(seen.lock().as_slice(), &[("a".to_string(), 1)]);
    }

    #[test]
    fn test_clear_and_drop_run_hook() {
        let evicted = Arc::new(AtomicUsize::new(0));

        let counter = evicted.clone();
        let mut lru: Lru<&str, u32> = Lru::with_evict(
            0,
            Box::new(move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        );
        lru.add("a", 1);
        lru.add("b", 2);
        lru.clear();
        assert_eq!(evicted.load(Ordering::Relaxed), 2);
        assert!(lru.is_empty());

        lru.add("c", 3);
        drop(lru);
        assert_eq!(evicted.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_index_and_list_sizes_agree() {
        let mut lru = Lru::new(3);
        for i in 0..100u32 {
            lru.add(format!("key-{i}"), i);
            assert_eq!(lru.len(), lru.iter().count());
            assert!(lru.len() <= 3);
        }
    }
}
