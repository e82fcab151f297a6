//! In-memory reference implementation of [`crate::DurableStoreClient`].

use std::collections::HashMap;

use e4s_core::error::Result;
use e4s_core::types::{EntityId, Granularity, Partition};
use parking_lot::Mutex;

use crate::{BitmapKey, DurableStoreClient};

/// Always-on in-memory durable store, used in engine tests in place of a
/// live relational backend.
#[derive(Default)]
pub struct MemoryDurableStore {
    rows: Mutex<HashMap<BitmapKey, Vec<u8>>>,
}

impl MemoryDurableStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStoreClient for MemoryDurableStore {
    fn get_bitmap(&self, key: &BitmapKey) -> Result<Option<Vec<u8>>> {
        Ok(self.rows.lock().get(key).cloned())
    }

    fn upsert_bitmap(&self, key: &BitmapKey, bytes: &[u8]) -> Result<()> {
        self.rows.lock().insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn delete_bitmap(&self, key: &BitmapKey) -> Result<()> {
        self.rows.lock().remove(key);
        Ok(())
    }

    fn delete_by_index_name(&self, index_name: &str) -> Result<()> {
        self.rows.lock().retain(|k, _| k.index_name != index_name);
        Ok(())
    }

    fn count_by_index_name(&self, index_name: &str) -> Result<u64> {
        Ok(self
            .rows
            .lock()
            .keys()
            .filter(|k| k.index_name == index_name)
            .count() as u64)
    }

    fn distinct_entities(&self, index_name: &str) -> Result<Vec<EntityId>> {
        let rows = self.rows.lock();
        let mut entities: Vec<EntityId> = rows
            .keys()
            .filter(|k| k.index_name == index_name)
            .map(|k| k.entity_id)
            .collect();
        entities.sort_unstable();
        entities.dedup();
        Ok(entities)
    }

    fn find_entity_ids(&self, index_name: &str) -> Result<Vec<EntityId>> {
        self.distinct_entities(index_name)
    }

    fn find_partitions(
        &self,
        index_name: &str,
        entity_id: EntityId,
        granularity: Granularity,
    ) -> Result<Vec<Partition>> {
        let rows = self.rows.lock();
        let mut partitions: Vec<Partition> = rows
            .keys()
            .filter(|k| {
                k.index_name == index_name && k.entity_id == entity_id && k.granularity == granularity
            })
            .map(|k| k.partition)
            .collect();
        partitions.sort_unstable();
        Ok(partitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(index: &str, entity: EntityId, partition: Partition) -> BitmapKey {
        BitmapKey::new(index, entity, Granularity::Day, partition)
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let store = MemoryDurableStore::new();
        let k = key("idx", 1, 0);
        assert_eq!(store.get_bitmap(&k).unwrap(), None);
        store.upsert_bitmap(&k, b"bytes").unwrap();
        assert_eq!(store.get_bitmap(&k).unwrap(), Some(b"bytes".to_vec()));
        store.upsert_bitmap(&k, b"newer").unwrap();
        assert_eq!(store.get_bitmap(&k).unwrap(), Some(b"newer".to_vec()));
    }

    #[test]
    fn delete_by_index_name_scopes_correctly() {
        let store = MemoryDurableStore::new();
        store.upsert_bitmap(&key("a", 1, 0), b"x").unwrap();
        store.upsert_bitmap(&key("b", 1, 0), b"x").unwrap();
        store.delete_by_index_name("a").unwrap();
        assert_eq!(store.count_by_index_name("a").unwrap(), 0);
        assert_eq!(store.count_by_index_name("b").unwrap(), 1);
    }

    #[test]
    fn distinct_entities_deduplicates_across_partitions() {
        let store = MemoryDurableStore::new();
        store.upsert_bitmap(&key("a", 7, 0), b"x").unwrap();
        store.upsert_bitmap(&key("a", 7, 1), b"x").unwrap();
        store.upsert_bitmap(&key("a", 9, 0), b"x").unwrap();
        assert_eq!(store.distinct_entities("a").unwrap(), vec![7, 9]);
    }

    #[test]
    fn find_partitions_scopes_by_granularity() {
        let store = MemoryDurableStore::new();
        store
            .upsert_bitmap(&BitmapKey::new("a", 1, Granularity::Day, 0), b"x")
            .unwrap();
        store
            .upsert_bitmap(&BitmapKey::new("a", 1, Granularity::Month, 2), b"x")
            .unwrap();
        assert_eq!(
            store.find_partitions("a", 1, Granularity::Day).unwrap(),
            vec![0]
        );
        assert_eq!(
            store.find_partitions("a", 1, Granularity::Month).unwrap(),
            vec![2]
        );
    }
}
