//! Bounded, insertion-ordered hot cache (C7).
//!
//! An `IndexMap`-backed map with a hard capacity and an eviction callback.
//! Eviction is insertion-order (LRU-on-insert, not true LRU): a key that is
//! read again is not promoted, only a key that is freshly inserted can
//! trigger an eviction. Dirty-tracking lives above this type, in the
//! engine's flush coordinator, so the cache itself stays a pure capacity
//! policy.

use indexmap::IndexMap;
use parking_lot::Mutex;

/// A capacity-bounded map that evicts the oldest-inserted entry to make
/// room for a new key once `max_size` is reached.
///
/// Updating an existing key never evicts and never changes that key's
/// position in the insertion order.
pub struct BoundedCache<V> {
    entries: Mutex<IndexMap<String, V>>,
    max_size: usize,
}

impl<V: Clone> BoundedCache<V> {
    /// A new cache holding at most `max_size` entries.
    ///
    /// `max_size == 0` disables caching: every `put` immediately evicts
    /// the entry it just inserted.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            max_size,
        }
    }

    /// The value stored at `key`, if present.
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    /// `true` if `key` is currently cached.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.lock().shift_remove(key)
    }

    /// All cached keys beginning with `prefix`, in insertion order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Insert or update `key` with `value`.
    ///
    /// If `key` is new and the cache is at capacity, the oldest-inserted
    /// entry is evicted first and passed to `on_evict` before the new
    /// entry is inserted. Updating an existing key never evicts.
    pub fn put(&self, key: String, value: V, mut on_evict: impl FnMut(&str, &V)) {
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            entries.insert(key, value);
            return;
        }
        if self.max_size == 0 {
            on_evict(&key, &value);
            return;
        }
        if entries.len() >= self.max_size {
            if let Some((evicted_key, evicted_value)) = entries.shift_remove_index(0) {
                on_evict(&evicted_key, &evicted_value);
            }
        }
        entries.insert(key, value);
    }

    /// Drop every cached entry without invoking an eviction hook.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn get_reflects_put() {
        let cache: BoundedCache<i32> = BoundedCache::new(4);
        assert_eq!(cache.get("a"), None);
        cache.put("a".to_string(), 1, |_, _| panic!("no eviction expected"));
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn update_does_not_evict_or_reorder() {
        let cache: BoundedCache<i32> = BoundedCache::new(2);
        cache.put("a".to_string(), 1, |_, _| panic!("no eviction expected"));
        cache.put("b".to_string(), 2, |_, _| panic!("no eviction expected"));
        cache.put("a".to_string(), 99, |_, _| panic!("no eviction expected"));
        assert_eq!(cache.get("a"), Some(99));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn exceeding_capacity_evicts_oldest_insert() {
        let cache: BoundedCache<i32> = BoundedCache::new(2);
        let evicted = RefCell::new(Vec::new());
        cache.put("a".to_string(), 1, |_, _| panic!("no eviction expected"));
        cache.put("b".to_string(), 2, |_, _| panic!("no eviction expected"));
        cache.put("c".to_string(), 3, |k, v| evicted.borrow_mut().push((k.to_string(), *v)));
        assert_eq!(evicted.into_inner(), vec![("a".to_string(), 1)]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn zero_capacity_evicts_immediately() {
        let cache: BoundedCache<i32> = BoundedCache::new(0);
        let mut seen = None;
        cache.put("a".to_string(), 1, |k, v| seen = Some((k.to_string(), *v)));
        assert_eq!(seen, Some(("a".to_string(), 1)));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn keys_with_prefix_filters_correctly() {
        let cache: BoundedCache<i32> = BoundedCache::new(10);
        cache.put("e4s:a:1".to_string(), 1, |_, _| {});
        cache.put("e4s:a:2".to_string(), 2, |_, _| {});
        cache.put("e4s:b:1".to_string(), 3, |_, _| {});
        let mut matches = cache.keys_with_prefix("e4s:a:");
        matches.sort();
        assert_eq!(matches, vec!["e4s:a:1".to_string(), "e4s:a:2".to_string()]);
    }

    #[test]
    fn remove_drops_entry() {
        let cache: BoundedCache<i32> = BoundedCache::new(4);
        cache.put("a".to_string(), 1, |_, _| {});
        assert_eq!(cache.remove("a"), Some(1));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.remove("a"), None);
    }
}
