//! Index engine (C9): public operations orchestrating C1–C8.
//!
//! One `IndexEngine` owns the key-lock table, the hot cache, the dirty set,
//! and the pending durable map for one logical deployment. The fast store
//! (C4) and durable store (C5) are borrowed collaborators with their own
//! lifecycles, matching the ownership split documented in `spec.md` §9.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use e4s_bitset::Bitset;
use e4s_concurrency::KeyLockTable;
use e4s_core::config::E4sConfig;
use e4s_core::error::{Error, Result};
use e4s_core::types::{EntityId, Granularity, IndexName, Partition, REGISTRY_KEY};
use e4s_durability::{BitmapKey, DurableStoreClient};
use e4s_storage::{BoundedCache, KvStoreClient};
use e4s_time::{epoch, partition};
use tracing::warn;

use crate::flusher::WriteBehindFlusher;
use crate::stats::IndexStats;

/// The in-process index engine. Cheap to clone (wraps `Arc` internals where
/// it matters); typically held behind one `Arc<IndexEngine>` per process.
pub struct IndexEngine {
    kv: Arc<dyn KvStoreClient>,
    durable: Option<Arc<dyn DurableStoreClient>>,
    cache: Arc<BoundedCache<Bitset>>,
    locks: KeyLockTable,
    flusher: Arc<WriteBehindFlusher>,
    durable_async_write: bool,
    closed: AtomicBool,
}

impl IndexEngine {
    /// Build an engine from `config`, the fast-store client, and an
    /// optional durable-store client (`None` disables C5 regardless of
    /// `config.index.persistence.enabled`).
    pub fn new(
        config: &E4sConfig,
        kv: Arc<dyn KvStoreClient>,
        durable: Option<Arc<dyn DurableStoreClient>>,
    ) -> Arc<Self> {
        let durable = if config.index.persistence.enabled {
            durable
        } else {
            None
        };
        let cache = Arc::new(BoundedCache::new(config.index.cache.max_size));
        let flusher = Arc::new(WriteBehindFlusher::new(
            Arc::clone(&kv),
            durable.clone(),
            Arc::clone(&cache),
            config.index.persistence.flush_interval_ms,
        ));
        flusher.start();
        Arc::new(Self {
            kv,
            durable,
            cache,
            locks: KeyLockTable::new(),
            flusher,
            durable_async_write: config.index.persistence.async_write,
            closed: AtomicBool::new(false),
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(AtomicOrdering::SeqCst) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    fn validate_name(&self, name: &str) -> Result<IndexName> {
        IndexName::new(name).map_err(|e| Error::NameInvalid(e.to_string()))
    }

    fn to_epoch(&self, millis: i64, granularity: Granularity) -> Result<u32> {
        epoch::to_epoch(millis, granularity).map_err(|e| Error::Fatal(e.to_string()))
    }

    /// Register `name` in the fast-store registry set.
    fn register_name(&self, name: &str) -> Result<()> {
        self.kv.set_add(REGISTRY_KEY, name)
    }

    fn put_in_cache(&self, key: String, bitset: Bitset) {
        let flusher = Arc::clone(&self.flusher);
        self.cache.put(key, bitset, move |evicted_key, evicted_bitset| {
            if flusher.is_dirty(evicted_key) {
                if let Err(err) = flusher.flush_one_now(evicted_key, evicted_bitset) {
                    warn!(key = evicted_key, error = %err, "eviction flush of dirty entry failed");
                }
            }
        });
    }

    /// Load the bitset for `key`, trying the cache, then the fast store,
    /// then (if enabled) the durable store. A successful durable load warms
    /// the cache and re-registers the index name in the fast store.
    fn load(&self, index: &IndexName, bitmap_key: &BitmapKey, key: &str) -> Result<Option<Bitset>> {
        if let Some(bitset) = self.cache.get(key) {
            return Ok(Some(bitset));
        }
        if let Some(bytes) = self.kv.get(key)? {
            return Ok(Some(self.decode_or_empty(key, &bytes)));
        }
        if let Some(durable) = &self.durable {
            if let Some(bytes) = durable.get_bitmap(bitmap_key)? {
                let bitset = self.decode_or_empty(key, &bytes);
                self.put_in_cache(key.to_string(), bitset.clone());
                self.register_name(index.as_str())?;
                return Ok(Some(bitset));
            }
        }
        Ok(None)
    }

    /// Load for a write: same as [`Self::load`] but substitutes an empty
    /// bitset instead of `None` so the caller always has something to add
    /// to. Never consults the durable store beyond what [`Self::load`]
    /// already does.
    fn load_for_write(
        &self,
        index: &IndexName,
        bitmap_key: &BitmapKey,
        key: &str,
    ) -> Result<Bitset> {
        Ok(self.load(index, bitmap_key, key)?.unwrap_or_default())
    }

    fn decode_or_empty(&self, key: &str, bytes: &[u8]) -> Bitset {
        match Bitset::deserialize(bytes) {
            Ok(bitset) => bitset,
            Err(err) => {
                warn!(key, error = %err, "corrupt bitset, treating slot as empty");
                Bitset::new()
            }
        }
    }

    fn bitmap_key(
        &self,
        index: &IndexName,
        entity_id: EntityId,
        granularity: Granularity,
        p: i64,
    ) -> BitmapKey {
        BitmapKey::new(index.as_str(), entity_id, granularity, p)
    }

    fn durable_key_string(
        index: &IndexName,
        entity_id: EntityId,
        granularity: Granularity,
        p: i64,
    ) -> String {
        format!("{}:{}:{}:{}", index.as_str(), entity_id, granularity, p)
    }

    /// Publish `bitset` for `key`/`bitmap_key`, respecting the write-behind
    /// configuration: synchronous fast/durable writes when write-behind is
    /// off, dirty/pending-map coalescing otherwise.
    fn publish(
        &self,
        index: &IndexName,
        entity_id: EntityId,
        granularity: Granularity,
        p: i64,
        key: &str,
        bitmap_key: &BitmapKey,
        bitset: &Bitset,
    ) -> Result<()> {
        if self.flusher.is_synchronous() {
            self.kv.set(key, &bitset.serialize())?;
            if let Some(durable) = self.durable.clone() {
                if self.durable_async_write {
                    let target = bitmap_key.clone();
                    let bytes = bitset.serialize();
                    std::thread::spawn(move || {
                        if let Err(err) = durable.upsert_bitmap(&target, &bytes) {
                            warn!(error = %err, "fire-and-forget durable write failed");
                        }
                    });
                } else {
                    durable.upsert_bitmap(bitmap_key, &bitset.serialize())?;
                }
            }
        } else {
            self.flusher.mark_dirty_kv(key.to_string());
            if self.durable.is_some() {
                let durable_key = Self::durable_key_string(index, entity_id, granularity, p);
                self.flusher
                    .mark_pending_durable(durable_key, bitmap_key.clone(), bitset.clone());
            }
        }
        Ok(())
    }

    // ---- C9 public operations ----

    /// Add `name` to the registry. Idempotent.
    pub fn create_index(&self, name: &str) -> Result<()> {
        self.check_open()?;
        let idx = self.validate_name(name)?;
        self.register_name(idx.as_str())
    }

    /// The registry set as a list, in unspecified order.
    pub fn list_indexes(&self) -> Result<Vec<String>> {
        self.check_open()?;
        Ok(self.kv.set_members(REGISTRY_KEY)?.into_iter().collect())
    }

    /// `true` if `name` is in the registry, or (when durable is enabled) if
    /// the durable store reports any row for it — in which case the
    /// registry is warmed back with `name` before returning.
    pub fn index_exists(&self, name: &str) -> Result<bool> {
        self.check_open()?;
        let idx = self.validate_name(name)?;
        if self.kv.set_is_member(REGISTRY_KEY, idx.as_str())? {
            return Ok(true);
        }
        if let Some(durable) = &self.durable {
            if durable.count_by_index_name(idx.as_str())? > 0 {
                self.register_name(idx.as_str())?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Delete every fast-store key under `name`'s prefix, remove it from
    /// the registry, evict matching cache entries, and (if durable is
    /// enabled) delete all of its durable rows. Idempotent.
    pub fn delete_index(&self, name: &str) -> Result<()> {
        self.check_open()?;
        let idx = self.validate_name(name)?;
        let prefix = e4s_core::types::KvKey::index_prefix(&idx);
        let keys = self.kv.scan_keys(&prefix)?;
        if !keys.is_empty() {
            let keys: Vec<String> = keys.into_iter().collect();
            self.kv.delete(&keys)?;
        }
        self.kv.set_remove(REGISTRY_KEY, idx.as_str())?;
        for key in self.cache.keys_with_prefix(&prefix) {
            self.cache.remove(&key);
        }
        if let Some(durable) = &self.durable {
            durable.delete_by_index_name(idx.as_str())?;
        }
        Ok(())
    }

    /// Add `value_millis` to the partition bitset for `(index, entity, granularity)`.
    pub fn mark(
        &self,
        index_name: &str,
        entity_id: EntityId,
        granularity: Granularity,
        value_millis: i64,
    ) -> Result<()> {
        self.mark_batch(index_name, entity_id, granularity, &[value_millis])
    }

    /// Add every value in `values_millis`, grouped by partition so each
    /// partition's write lock is acquired exactly once.
    pub fn mark_batch(
        &self,
        index_name: &str,
        entity_id: EntityId,
        granularity: Granularity,
        values_millis: &[i64],
    ) -> Result<()> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;

        let mut by_partition: std::collections::BTreeMap<i64, Vec<u32>> =
            std::collections::BTreeMap::new();
        for &millis in values_millis {
            let v = self.to_epoch(millis, granularity)?;
            let p = partition::partition_of(v, granularity);
            by_partition.entry(p).or_default().push(v);
        }

        for (p, values) in by_partition {
            let key = partition::key(&idx, granularity, entity_id, p);
            let bitmap_key = self.bitmap_key(&idx, entity_id, granularity, p);
            let _guard = self.locks.write_lock(key.as_str());
            let mut bitset = self.load_for_write(&idx, &bitmap_key, key.as_str())?;
            bitset.add_all(values);
            self.put_in_cache(key.as_str().to_string(), bitset.clone());
            self.publish(&idx, entity_id, granularity, p, key.as_str(), &bitmap_key, &bitset)?;
        }
        Ok(())
    }

    /// `true` if `value_millis` is present in its partition's bitset.
    pub fn exists(
        &self,
        index_name: &str,
        entity_id: EntityId,
        granularity: Granularity,
        value_millis: i64,
    ) -> Result<bool> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;
        let v = self.to_epoch(value_millis, granularity)?;
        let p = partition::partition_of(v, granularity);
        let key = partition::key(&idx, granularity, entity_id, p);
        let bitmap_key = self.bitmap_key(&idx, entity_id, granularity, p);
        let _guard = self.locks.read_lock(key.as_str());
        Ok(self
            .load(&idx, &bitmap_key, key.as_str())?
            .is_some_and(|b| b.contains(v)))
    }

    /// The greatest marked value strictly before `value_millis`, reading
    /// into the adjacent partition (fast store only, bypassing the cache)
    /// when this partition doesn't yield one.
    pub fn find_prev(
        &self,
        index_name: &str,
        entity_id: EntityId,
        granularity: Granularity,
        value_millis: i64,
    ) -> Result<Option<i64>> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;
        let v = self.to_epoch(value_millis, granularity)?;
        let p = partition::partition_of(v, granularity);
        let key = partition::key(&idx, granularity, entity_id, p);
        let bitmap_key = self.bitmap_key(&idx, entity_id, granularity, p);

        let here = {
            let _guard = self.locks.read_lock(key.as_str());
            self.load(&idx, &bitmap_key, key.as_str())?
                .and_then(|b| b.prev_of(v))
        };
        if let Some(found) = here {
            return Ok(Some(epoch::from_epoch(found, granularity)));
        }
        if p == 0 {
            return Ok(None);
        }
        let adjacent = partition::key(&idx, granularity, entity_id, p - 1);
        let adjacent_max = self
            .kv
            .get(adjacent.as_str())?
            .map(|bytes| self.decode_or_empty(adjacent.as_str(), &bytes))
            .and_then(|b| b.max());
        Ok(adjacent_max.map(|found| epoch::from_epoch(found, granularity)))
    }

    /// The smallest marked value strictly after `value_millis`, symmetric
    /// to [`Self::find_prev`].
    pub fn find_next(
        &self,
        index_name: &str,
        entity_id: EntityId,
        granularity: Granularity,
        value_millis: i64,
    ) -> Result<Option<i64>> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;
        let v = self.to_epoch(value_millis, granularity)?;
        let p = partition::partition_of(v, granularity);
        let key = partition::key(&idx, granularity, entity_id, p);
        let bitmap_key = self.bitmap_key(&idx, entity_id, granularity, p);

        let here = {
            let _guard = self.locks.read_lock(key.as_str());
            self.load(&idx, &bitmap_key, key.as_str())?
                .and_then(|b| b.next_of(v))
        };
        if let Some(found) = here {
            return Ok(Some(epoch::from_epoch(found, granularity)));
        }
        let adjacent = partition::key(&idx, granularity, entity_id, p + 1);
        let adjacent_min = self
            .kv
            .get(adjacent.as_str())?
            .map(|bytes| self.decode_or_empty(adjacent.as_str(), &bytes))
            .and_then(|b| b.min());
        Ok(adjacent_min.map(|found| epoch::from_epoch(found, granularity)))
    }

    /// Remove every cache entry for `(index_name, entity_id)` across all
    /// granularities and partitions. Implemented as a bounded scan of the
    /// index's cached keys rather than an entity-keyed side index
    /// (`spec.md` §4.9 permits either).
    pub fn evict_entity(&self, index_name: &str, entity_id: EntityId) -> Result<()> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;
        let prefix = e4s_core::types::KvKey::index_prefix(&idx);
        let needle = format!(":{entity_id}:");
        for key in self.cache.keys_with_prefix(&prefix) {
            if key.contains(&needle) {
                self.cache.remove(&key);
            }
        }
        Ok(())
    }

    /// Remove every cache entry under `index_name`'s prefix.
    pub fn evict_index(&self, index_name: &str) -> Result<()> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;
        let prefix = e4s_core::types::KvKey::index_prefix(&idx);
        for key in self.cache.keys_with_prefix(&prefix) {
            self.cache.remove(&key);
        }
        Ok(())
    }

    /// Distinct DAY-granularity keys under `index_name` in the fast store —
    /// a coarse, fast proxy for entity count (`spec.md` §9).
    pub fn entity_count(&self, index_name: &str) -> Result<u64> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;
        let prefix = e4s_core::types::KvKey::day_prefix(&idx);
        Ok(self.kv.scan_keys(&prefix)?.len() as u64)
    }

    /// Process-local stats for `index_name`.
    pub fn stats(&self, index_name: &str) -> Result<IndexStats> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;
        let prefix = e4s_core::types::KvKey::index_prefix(&idx);
        let cached_keys = self.cache.keys_with_prefix(&prefix);
        let memory_usage_bytes: usize = cached_keys
            .iter()
            .filter_map(|k| self.cache.get(k))
            .map(|b| b.size_in_bytes())
            .sum();
        Ok(IndexStats {
            entity_count: self.entity_count(index_name)?,
            cache_size: cached_keys.len(),
            memory_usage_bytes,
        })
    }

    /// Replay every durable row under `index_name` back into the fast store
    /// and the cache, reporting progress to `status` as each entity
    /// completes. Requires a durable store to be configured.
    pub fn reindex_index(
        &self,
        index_name: &str,
        status: &e4s_durability::ReindexStatusStore,
    ) -> Result<()> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;
        let durable = self.require_durable()?;
        let entities = durable.find_entity_ids(idx.as_str())?;
        status.start(idx.as_str(), Some(entities.len() as u64));
        let mut processed = 0u64;
        for entity_id in entities {
            if let Err(err) = self.reindex_entity(&idx, durable, entity_id) {
                status.fail(idx.as_str(), err.to_string());
                return Err(err);
            }
            processed += 1;
            status.advance(idx.as_str(), processed);
        }
        self.register_name(idx.as_str())?;
        status.complete(idx.as_str());
        Ok(())
    }

    /// Replay durable rows for a single `(granularity, partition)` across
    /// every entity known to `index_name`, skipping entities with no row in
    /// that partition. Reports progress to `status` the same as
    /// [`Self::reindex_index`].
    pub fn reindex_partition(
        &self,
        index_name: &str,
        granularity: Granularity,
        partition: Partition,
        status: &e4s_durability::ReindexStatusStore,
    ) -> Result<()> {
        self.check_open()?;
        let idx = self.validate_name(index_name)?;
        let durable = self.require_durable()?;
        let entities = durable.find_entity_ids(idx.as_str())?;
        status.start(idx.as_str(), Some(entities.len() as u64));
        let mut processed = 0u64;
        for entity_id in entities {
            let bitmap_key = self.bitmap_key(&idx, entity_id, granularity, partition);
            let fetched = durable.get_bitmap(&bitmap_key);
            match fetched {
                Ok(Some(bytes)) => {
                    let key = partition::key(&idx, granularity, entity_id, partition);
                    let bitset = self.decode_or_empty(key.as_str(), &bytes);
                    if let Err(err) = self.kv.set(key.as_str(), &bytes) {
                        status.fail(idx.as_str(), err.to_string());
                        return Err(err);
                    }
                    self.put_in_cache(key.as_str().to_string(), bitset);
                }
                Ok(None) => {}
                Err(err) => {
                    status.fail(idx.as_str(), err.to_string());
                    return Err(err);
                }
            }
            processed += 1;
            status.advance(idx.as_str(), processed);
        }
        status.complete(idx.as_str());
        Ok(())
    }

    fn require_durable(&self) -> Result<&Arc<dyn DurableStoreClient>> {
        self.durable
            .as_ref()
            .ok_or_else(|| Error::Fatal("persistence is not enabled for this index".to_string()))
    }

    fn reindex_entity(
        &self,
        idx: &IndexName,
        durable: &Arc<dyn DurableStoreClient>,
        entity_id: EntityId,
    ) -> Result<()> {
        for granularity in Granularity::ALL {
            for partition in durable.find_partitions(idx.as_str(), entity_id, granularity)? {
                let bitmap_key = self.bitmap_key(idx, entity_id, granularity, partition);
                if let Some(bytes) = durable.get_bitmap(&bitmap_key)? {
                    let key = partition::key(idx, granularity, entity_id, partition);
                    let bitset = self.decode_or_empty(key.as_str(), &bytes);
                    self.kv.set(key.as_str(), &bytes)?;
                    self.put_in_cache(key.as_str().to_string(), bitset);
                }
            }
        }
        Ok(())
    }

    /// Flush, stop the background flusher within its grace period, and
    /// clear the cache and lock table. All subsequent operations except
    /// `close` itself fail with [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, AtomicOrdering::SeqCst) {
            return Ok(());
        }
        self.flusher.close();
        self.cache.clear();
        self.locks.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use e4s_durability::MemoryDurableStore;
    use e4s_storage::InMemoryKvStore;

    fn engine() -> Arc<IndexEngine> {
        let config = E4sConfig::default();
        IndexEngine::new(&config, Arc::new(InMemoryKvStore::new()), None)
    }

    fn synchronous_engine_with_durable() -> Arc<IndexEngine> {
        let mut config = E4sConfig::default();
        config.index.persistence.enabled = true;
        config.index.persistence.flush_interval_ms = 0;
        config.index.persistence.async_write = false;
        IndexEngine::new(
            &config,
            Arc::new(InMemoryKvStore::new()),
            Some(Arc::new(MemoryDurableStore::new())),
        )
    }

    #[test]
    fn mark_then_exists_is_true() {
        let engine = engine();
        engine.create_index("meter-data").unwrap();
        engine
            .mark("meter-data", 1, Granularity::Day, 1_704_067_200_000)
            .unwrap();
        assert!(engine
            .exists("meter-data", 1, Granularity::Day, 1_704_067_200_000)
            .unwrap());
        assert!(!engine
            .exists("meter-data", 1, Granularity::Day, 1_704_153_600_000)
            .unwrap());
    }

    #[test]
    fn registry_round_trip() {
        let engine = engine();
        engine.create_index("a").unwrap();
        engine.create_index("b").unwrap();
        let mut names = engine.list_indexes().unwrap();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        engine.delete_index("a").unwrap();
        assert_eq!(engine.list_indexes().unwrap(), vec!["b".to_string()]);
        assert!(!engine.index_exists("a").unwrap());
    }

    #[test]
    fn cross_partition_prev_crosses_boundary() {
        let engine = engine();
        engine.create_index("meter-data").unwrap();
        let day = |d: i64| d * 86_400_000;
        engine
            .mark_batch("meter-data", 12345, Granularity::Day, &[day(20100), day(20175)])
            .unwrap();
        assert_eq!(
            engine
                .find_prev("meter-data", 12345, Granularity::Day, day(20200))
                .unwrap(),
            Some(day(20175))
        );
        assert_eq!(
            engine
                .find_prev("meter-data", 12345, Granularity::Day, day(20175))
                .unwrap(),
            Some(day(20100))
        );
    }

    #[test]
    fn cross_partition_next_crosses_boundary() {
        let engine = engine();
        engine.create_index("meter-data").unwrap();
        let day = |d: i64| d * 86_400_000;
        engine
            .mark("meter-data", 1, Granularity::Day, day(20100))
            .unwrap();
        assert_eq!(
            engine.find_next("meter-data", 1, Granularity::Day, day(20100)).unwrap(),
            None
        );
        engine.mark("meter-data", 1, Granularity::Day, day(20200)).unwrap();
        assert_eq!(
            engine.find_next("meter-data", 1, Granularity::Day, day(20100)).unwrap(),
            Some(day(20200))
        );
    }

    #[test]
    fn prev_and_next_are_strict_at_the_marked_value_itself() {
        let engine = engine();
        engine.create_index("meter-data").unwrap();
        let day = |d: i64| d * 86_400_000;
        engine.mark("meter-data", 1, Granularity::Day, day(100)).unwrap();
        assert_ne!(
            engine.find_prev("meter-data", 1, Granularity::Day, day(100)).unwrap(),
            Some(day(100))
        );
        assert_ne!(
            engine.find_next("meter-data", 1, Granularity::Day, day(100)).unwrap(),
            Some(day(100))
        );
    }

    #[test]
    fn delete_index_then_exists_is_false() {
        let engine = engine();
        engine.create_index("meter-data").unwrap();
        engine
            .mark("meter-data", 1, Granularity::Day, 1_704_067_200_000)
            .unwrap();
        engine.delete_index("meter-data").unwrap();
        assert!(!engine.index_exists("meter-data").unwrap());
        assert!(!engine
            .exists("meter-data", 1, Granularity::Day, 1_704_067_200_000)
            .unwrap());
    }

    #[test]
    fn closed_engine_rejects_operations() {
        let engine = engine();
        engine.create_index("meter-data").unwrap();
        engine.close().unwrap();
        assert!(matches!(engine.create_index("other"), Err(Error::Closed)));
        assert!(matches!(
            engine.mark("meter-data", 1, Granularity::Day, 0),
            Err(Error::Closed)
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let engine = engine();
        engine.close().unwrap();
        engine.close().unwrap();
    }

    #[test]
    fn synchronous_durable_writes_are_visible_immediately() {
        let engine = synchronous_engine_with_durable();
        engine.create_index("meter-data").unwrap();
        engine
            .mark("meter-data", 1, Granularity::Day, 1_704_067_200_000)
            .unwrap();
        let partition = partition::partition_of(19723, Granularity::Day);
        let key = BitmapKey::new("meter-data", 1, Granularity::Day, partition);
        assert!(engine.durable.as_ref().unwrap().get_bitmap(&key).unwrap().is_some());
    }

    #[test]
    fn invalid_index_name_is_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.create_index("has space"),
            Err(Error::NameInvalid(_))
        ));
    }

    #[test]
    fn entity_count_reflects_distinct_day_keys() {
        let engine = engine();
        engine.create_index("meter-data").unwrap();
        engine.mark("meter-data", 1, Granularity::Day, 0).unwrap();
        engine.mark("meter-data", 2, Granularity::Day, 0).unwrap();
        assert_eq!(engine.entity_count("meter-data").unwrap(), 2);
    }

    #[test]
    fn reindex_index_without_durable_is_fatal() {
        let engine = engine();
        engine.create_index("meter-data").unwrap();
        let status = e4s_durability::ReindexStatusStore::new();
        assert!(matches!(
            engine.reindex_index("meter-data", &status),
            Err(Error::Fatal(_))
        ));
    }

    #[test]
    fn reindex_index_replays_durable_rows_into_fast_store() {
        let engine = synchronous_engine_with_durable();
        engine.create_index("meter-data").unwrap();
        let day = |d: i64| d * 86_400_000;
        engine
            .mark("meter-data", 1, Granularity::Day, day(20100))
            .unwrap();
        engine.evict_index("meter-data").unwrap();

        let fresh_kv: Arc<dyn KvStoreClient> = Arc::new(InMemoryKvStore::new());
        let mut config = E4sConfig::default();
        config.index.persistence.enabled = true;
        let fresh = IndexEngine::new(&config, fresh_kv, Some(engine.durable.clone().unwrap()));

        let status = e4s_durability::ReindexStatusStore::new();
        fresh.reindex_index("meter-data", &status).unwrap();
        assert_eq!(status.status("meter-data").state, e4s_durability::ReindexState::Completed);
        assert!(fresh
            .exists("meter-data", 1, Granularity::Day, day(20100))
            .unwrap());
    }

    #[test]
    fn reindex_partition_replays_only_that_partition() {
        let engine = synchronous_engine_with_durable();
        engine.create_index("meter-data").unwrap();
        let day = |d: i64| d * 86_400_000;
        engine
            .mark("meter-data", 1, Granularity::Day, day(20100))
            .unwrap();

        let fresh_kv: Arc<dyn KvStoreClient> = Arc::new(InMemoryKvStore::new());
        let mut config = E4sConfig::default();
        config.index.persistence.enabled = true;
        let fresh = IndexEngine::new(&config, fresh_kv, Some(engine.durable.clone().unwrap()));

        let partition = partition::partition_of(20100, Granularity::Day);
        let status = e4s_durability::ReindexStatusStore::new();
        fresh
            .reindex_partition("meter-data", Granularity::Day, partition, &status)
            .unwrap();
        assert!(fresh
            .exists("meter-data", 1, Granularity::Day, day(20100))
            .unwrap());
    }
}
