//! Key locks (C6): a map from [`KvKey`] to a read-write lock, lazily
//! populated.
//!
//! Shared locks let reads proceed concurrently for the same key; an
//! exclusive lock blocks readers and other writers of that key. Different
//! keys are fully independent — this is what lets `mark` on entity A and
//! `mark` on entity B run in parallel with zero contention. A single
//! global mutex would serialize every write in the system and is
//! unacceptable for this workload (`spec.md` §9).
//!
//! The table is process-local to one engine instance and is cleared on
//! `close`.

#![warn(missing_docs)]
#![warn(clippy::all)]

use dashmap::DashMap;
use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use std::sync::Arc;

/// Lazily-populated table of per-key read-write locks.
pub struct KeyLockTable {
    locks: DashMap<String, Arc<RwLock<()>>>,
}

/// Held while a reader has the shared lock for one key. Drop to release.
pub type ReadGuard = ArcRwLockReadGuard<RawRwLock, ()>;

/// Held while a writer has the exclusive lock for one key. Drop to release.
pub type WriteGuard = ArcRwLockWriteGuard<RawRwLock, ()>;

impl KeyLockTable {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, key: &str) -> Arc<RwLock<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Acquire the shared (read) lock for `key`, blocking until available.
    /// Any number of readers may hold this concurrently for the same key.
    pub fn read_lock(&self, key: &str) -> ReadGuard {
        self.lock_for(key).read_arc()
    }

    /// Acquire the exclusive (write) lock for `key`, blocking until
    /// available. Blocks out readers and other writers of the same key;
    /// writers on other keys are unaffected.
    pub fn write_lock(&self, key: &str) -> WriteGuard {
        self.lock_for(key).write_arc()
    }

    /// Number of keys currently tracked (locks are never proactively
    /// removed except by [`Self::clear`] — an uncontended, unheld lock for
    /// a key that was touched once and never again still occupies a small
    /// entry here; this is a deliberate simplicity/memory trade since the
    /// lock table is bounded by the number of distinct partitions ever
    /// touched, not by cache capacity).
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// `true` if no key has ever been locked (or the table was just cleared).
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drop every tracked lock. Called on engine `close`.
    pub fn clear(&self) {
        self.locks.clear();
    }
}

impl Default for KeyLockTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn different_keys_are_independent() {
        let table = Arc::new(KeyLockTable::new());
        let barrier = Arc::new(Barrier::new(2));

        let t1 = {
            let table = Arc::clone(&table);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let _g = table.write_lock("a");
                barrier.wait();
                thread::sleep(std::time::Duration::from_millis(20));
            })
        };
        let t2 = {
            let table = Arc::clone(&table);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                // Different key — must not block behind t1's write lock on "a".
                let start = std::time::Instant::now();
                let _g = table.write_lock("b");
                assert!(start.elapsed() < std::time::Duration::from_millis(20));
            })
        };
        t1.join().unwrap();
        t2.join().unwrap();
    }

    #[test]
    fn readers_share_writers_exclude() {
        let table = Arc::new(KeyLockTable::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let table = Arc::clone(&table);
            let counter = Arc::clone(&counter);
            let max_concurrent = Arc::clone(&max_concurrent);
            handles.push(thread::spawn(move || {
                let _g = table.read_lock("k");
                let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(now, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(5));
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(max_concurrent.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn clear_releases_tracked_keys() {
        let table = KeyLockTable::new();
        {
            let _g = table.write_lock("x");
        }
        assert_eq!(table.len(), 1);
        table.clear();
        assert!(table.is_empty());
    }
}
