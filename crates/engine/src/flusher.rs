//! Write-behind flusher (C8): periodic background flush of dirty fast-store
//! keys and coalesced pending durable writes.
//!
//! A single named worker thread, an `AtomicBool` shutdown flag, and a
//! condvar-based wait instead of a busy-sleep loop, running one fixed job
//! (`tick`) on a period rather than a queue of arbitrary submitted work.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use dashmap::DashMap;
use e4s_bitset::Bitset;
use e4s_core::error::Result;
use e4s_durability::{BitmapKey, DurableStoreClient};
use e4s_storage::{BoundedCache, KvStoreClient};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

/// Bounded grace period `close()` waits for the background thread to stop.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct Shared {
    kv: Arc<dyn KvStoreClient>,
    durable: Option<Arc<dyn DurableStoreClient>>,
    cache: Arc<BoundedCache<Bitset>>,
    dirty_kv: DashMap<String, ()>,
    pending_durable: DashMap<String, (BitmapKey, Bitset)>,
    shutdown: AtomicBool,
    wake: Condvar,
    wake_lock: Mutex<()>,
}

/// Coalesces dirty-KV keys and pending durable-store writes between ticks,
/// and flushes both on a fixed interval and on demand.
pub struct WriteBehindFlusher {
    shared: Arc<Shared>,
    flush_interval_ms: u64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WriteBehindFlusher {
    /// Build a flusher. The background thread is started by
    /// [`WriteBehindFlusher::start`] only when `flush_interval_ms > 0`.
    pub fn new(
        kv: Arc<dyn KvStoreClient>,
        durable: Option<Arc<dyn DurableStoreClient>>,
        cache: Arc<BoundedCache<Bitset>>,
        flush_interval_ms: u64,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                kv,
                durable,
                cache,
                dirty_kv: DashMap::new(),
                pending_durable: DashMap::new(),
                shutdown: AtomicBool::new(false),
                wake: Condvar::new(),
                wake_lock: Mutex::new(()),
            }),
            flush_interval_ms,
            worker: Mutex::new(None),
        }
    }

    /// `true` when write-behind is disabled and every mark must flush
    /// synchronously.
    pub fn is_synchronous(&self) -> bool {
        self.flush_interval_ms == 0
    }

    /// Start the background tick thread, if write-behind is enabled and it
    /// is not already running.
    pub fn start(self: &Arc<Self>) {
        if self.is_synchronous() {
            return;
        }
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let interval = Duration::from_millis(self.flush_interval_ms);
        let handle = std::thread::Builder::new()
            .name("e4s-flusher".to_string())
            .spawn(move || tick_loop(shared, interval))
            .expect("failed to spawn write-behind flusher thread");
        *worker = Some(handle);
    }

    /// Mark `key`'s cached bitset as needing a fast-store flush.
    pub fn mark_dirty_kv(&self, key: String) {
        self.shared.dirty_kv.insert(key, ());
    }

    /// `true` if `key` has an unflushed fast-store write pending.
    pub fn is_dirty(&self, key: &str) -> bool {
        self.shared.dirty_kv.contains_key(key)
    }

    /// Merge `bitset` into the pending durable write for `durable_key`
    /// (union with any bitset already pending for that key).
    pub fn mark_pending_durable(&self, durable_key: String, target: BitmapKey, bitset: Bitset) {
        self.shared
            .pending_durable
            .entry(durable_key)
            .and_modify(|(_, existing)| existing.union_with(&bitset))
            .or_insert((target, bitset));
    }

    /// Immediately flush `key` to the fast store using `bitset`, bypassing
    /// the dirty set. Used when a dirty entry is evicted from the cache.
    pub fn flush_one_now(&self, key: &str, bitset: &Bitset) -> Result<()> {
        let bytes = bitset.serialize();
        self.shared.kv.set(key, &bytes)?;
        self.shared.dirty_kv.remove(key);
        Ok(())
    }

    /// Run one flush pass: drain the dirty-KV set into the fast store, then
    /// drain the pending durable map into the durable store. Best-effort —
    /// a key missing from the cache or a backend error is logged and
    /// skipped rather than propagated, per the background-path policy in
    /// `spec.md` §7.
    pub fn flush_now(&self) {
        flush_pass(&self.shared);
    }

    /// Stop the background thread (if running) and perform one final flush.
    /// Waits up to [`SHUTDOWN_GRACE`] for the thread to exit.
    pub fn close(&self) {
        self.shared.shutdown.store(true, AtomicOrdering::SeqCst);
        {
            let _guard = self.shared.wake_lock.lock();
            self.shared.wake.notify_all();
        }
        if let Some(handle) = self.worker.lock().take() {
            let start = std::time::Instant::now();
            while !handle.is_finished() && start.elapsed() < SHUTDOWN_GRACE {
                std::thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!("write-behind flusher did not stop within grace period");
            }
        }
        flush_pass(&self.shared);
    }
}

fn tick_loop(shared: Arc<Shared>, interval: Duration) {
    loop {
        {
            let mut guard = shared.wake_lock.lock();
            let timed_out = shared.wake.wait_for(&mut guard, interval).timed_out();
            if !timed_out && shared.shutdown.load(AtomicOrdering::SeqCst) {
                return;
            }
        }
        if shared.shutdown.load(AtomicOrdering::SeqCst) {
            return;
        }
        flush_pass(&shared);
    }
}

fn flush_pass(shared: &Shared) {
    let dirty_keys: Vec<String> = shared.dirty_kv.iter().map(|e| e.key().clone()).collect();
    for key in dirty_keys {
        let Some(bitset) = shared.cache.get(&key) else {
            debug!(key, "dirty key missing from cache, skipping flush");
            continue;
        };
        let bytes = bitset.serialize();
        if let Err(err) = shared.kv.set(&key, &bytes) {
            warn!(key, error = %err, "fast-store flush failed, will retry next tick");
            continue;
        }
        shared.dirty_kv.remove(&key);
    }

    if let Some(durable) = &shared.durable {
        let pending: Vec<(String, BitmapKey, Bitset)> = shared
            .pending_durable
            .iter()
            .map(|e| {
                let (target, bitset) = e.value();
                (e.key().clone(), target.clone(), bitset.clone())
            })
            .collect();
        for (durable_key, target, bitset) in pending {
            let bytes = bitset.serialize();
            if let Err(err) = durable.upsert_bitmap(&target, &bytes) {
                warn!(durable_key, error = %err, "durable-store flush failed, will retry next tick");
                continue;
            }
            shared.pending_durable.remove(&durable_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use e4s_storage::InMemoryKvStore;

    fn flusher(interval_ms: u64) -> WriteBehindFlusher {
        WriteBehindFlusher::new(
            Arc::new(InMemoryKvStore::new()),
            None,
            Arc::new(BoundedCache::new(100)),
            interval_ms,
        )
    }

    #[test]
    fn synchronous_mode_is_detected() {
        assert!(flusher(0).is_synchronous());
        assert!(!flusher(50).is_synchronous());
    }

    #[test]
    fn flush_now_skips_keys_missing_from_cache() {
        let f = flusher(0);
        f.mark_dirty_kv("k1".to_string());
        f.flush_now();
    }

    #[test]
    fn flush_now_publishes_cached_bitset() {
        let f = flusher(0);
        let mut bitset = Bitset::new();
        bitset.add(42);
        f.shared.cache.put("k1".to_string(), bitset, |_, _| {});
        f.mark_dirty_kv("k1".to_string());
        f.flush_now();
        let stored = f.shared.kv.get("k1").unwrap().unwrap();
        assert_eq!(Bitset::deserialize(&stored).unwrap().to_array(), vec![42]);
    }

    #[test]
    fn pending_durable_coalesces_by_union() {
        let f = flusher(0);
        let target = BitmapKey::new("idx", 1, e4s_core::types::Granularity::Day, 0);
        let mut a = Bitset::new();
        a.add(1);
        let mut b = Bitset::new();
        b.add(2);
        f.mark_pending_durable("idx:1:day:0".to_string(), target.clone(), a);
        f.mark_pending_durable("idx:1:day:0".to_string(), target, b);
        assert_eq!(f.shared.pending_durable.len(), 1);
        let merged = f.shared.pending_durable.get("idx:1:day:0").unwrap();
        let mut expected = merged.1.to_array();
        expected.sort_unstable();
        assert_eq!(expected, vec![1, 2]);
    }

    #[test]
    fn close_without_start_does_not_block() {
        let f = flusher(50);
        f.close();
    }
}
