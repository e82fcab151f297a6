//! `rusqlite`-backed durable store, implementing the `meter_index_partitioned`
//! logical schema from `spec.md` §6. SQLite is a legitimate relational
//! backend for this engine's single-writer-per-process deployment shape.

use e4s_core::error::{Error, Result};
use e4s_core::types::{EntityId, Granularity, Partition};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::{BitmapKey, DurableStoreClient};

fn granularity_code(g: Granularity) -> &'static str {
    g.as_lowercase()
}

fn parse_granularity(code: &str) -> Option<Granularity> {
    match code {
        "day" => Some(Granularity::Day),
        "month" => Some(Granularity::Month),
        "year" => Some(Granularity::Year),
        _ => None,
    }
}

/// SQLite-backed implementation of [`DurableStoreClient`].
///
/// Holds a single connection behind a mutex: the engine's write path is
/// already serialized per key by the key-lock table (C6), and SQLite itself
/// serializes writers, so a shared connection does not introduce additional
/// contention beyond what the engine already has.
pub struct SqliteDurableStore {
    conn: Mutex<Connection>,
}

impl SqliteDurableStore {
    /// Open (creating if necessary) the database at `path` and ensure the
    /// schema exists.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::Fatal(format!("failed to open durable store: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// An in-process, non-persistent SQLite database. Useful for tests that
    /// want real SQL semantics without a file on disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Fatal(format!("failed to open durable store: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meter_index_partitioned (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                index_name TEXT NOT NULL,
                entity_id INTEGER NOT NULL,
                granularity TEXT NOT NULL,
                partition_num INTEGER NOT NULL,
                bitmap_data BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(index_name, entity_id, granularity, partition_num)
            );
            CREATE INDEX IF NOT EXISTS idx_meter_index_lookup
                ON meter_index_partitioned(index_name, entity_id, granularity, partition_num);
            CREATE INDEX IF NOT EXISTS idx_meter_index_entity
                ON meter_index_partitioned(index_name, entity_id);
            CREATE TABLE IF NOT EXISTS reindex_status (
                index_name TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                entities_processed INTEGER NOT NULL DEFAULT 0,
                entities_total INTEGER,
                message TEXT
            );",
        )
        .map_err(|e| Error::Fatal(format!("failed to initialize schema: {e}")))?;
        Ok(())
    }

    fn map_err(e: rusqlite::Error) -> Error {
        Error::Transient(format!("sqlite error: {e}"))
    }
}

impl DurableStoreClient for SqliteDurableStore {
    fn get_bitmap(&self, key: &BitmapKey) -> Result<Option<Vec<u8>>> {
        self.conn
            .lock()
            .query_row(
                "SELECT bitmap_data FROM meter_index_partitioned
                 WHERE index_name = ?1 AND entity_id = ?2 AND granularity = ?3 AND partition_num = ?4",
                params![
                    key.index_name,
                    key.entity_id,
                    granularity_code(key.granularity),
                    key.partition
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(Self::map_err)
    }

    fn upsert_bitmap(&self, key: &BitmapKey, bytes: &[u8]) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO meter_index_partitioned
                    (index_name, entity_id, granularity, partition_num, bitmap_data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, unixepoch(), unixepoch())
                 ON CONFLICT(index_name, entity_id, granularity, partition_num)
                 DO UPDATE SET bitmap_data = excluded.bitmap_data, updated_at = unixepoch()",
                params![
                    key.index_name,
                    key.entity_id,
                    granularity_code(key.granularity),
                    key.partition,
                    bytes
                ],
            )
            .map_err(Self::map_err)?;
        Ok(())
    }

    fn delete_bitmap(&self, key: &BitmapKey) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "DELETE FROM meter_index_partitioned
                 WHERE index_name = ?1 AND entity_id = ?2 AND granularity = ?3 AND partition_num = ?4",
                params![
                    key.index_name,
                    key.entity_id,
                    granularity_code(key.granularity),
                    key.partition
                ],
            )
            .map_err(Self::map_err)?;
        Ok(())
    }

    fn delete_by_index_name(&self, index_name: &str) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "DELETE FROM meter_index_partitioned WHERE index_name = ?1",
                params![index_name],
            )
            .map_err(Self::map_err)?;
        Ok(())
    }

    fn count_by_index_name(&self, index_name: &str) -> Result<u64> {
        let count: i64 = self
            .conn
            .lock()
            .query_row(
                "SELECT COUNT(*) FROM meter_index_partitioned WHERE index_name = ?1",
                params![index_name],
                |row| row.get(0),
            )
            .map_err(Self::map_err)?;
        Ok(count as u64)
    }

    fn distinct_entities(&self, index_name: &str) -> Result<Vec<EntityId>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT entity_id FROM meter_index_partitioned
                 WHERE index_name = ?1 ORDER BY entity_id",
            )
            .map_err(Self::map_err)?;
        let rows = stmt
            .query_map(params![index_name], |row| row.get(0))
            .map_err(Self::map_err)?;
        rows.collect::<rusqlite::Result<Vec<EntityId>>>()
            .map_err(Self::map_err)
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
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT partition_num FROM meter_index_partitioned
                 WHERE index_name = ?1 AND entity_id = ?2 AND granularity = ?3
                 ORDER BY partition_num",
            )
            .map_err(Self::map_err)?;
        let rows = stmt
            .query_map(
                params![index_name, entity_id, granularity_code(granularity)],
                |row| row.get(0),
            )
            .map_err(Self::map_err)?;
        rows.collect::<rusqlite::Result<Vec<Partition>>>()
            .map_err(Self::map_err)
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
        let store = SqliteDurableStore::open_in_memory().unwrap();
        let k = key("idx", 1, 0);
        assert_eq!(store.get_bitmap(&k).unwrap(), None);
        store.upsert_bitmap(&k, b"bytes").unwrap();
        assert_eq!(store.get_bitmap(&k).unwrap(), Some(b"bytes".to_vec()));
        store.upsert_bitmap(&k, b"newer").unwrap();
        assert_eq!(store.get_bitmap(&k).unwrap(), Some(b"newer".to_vec()));
    }

    #[test]
    fn delete_by_index_name_scopes_correctly() {
        let store = SqliteDurableStore::open_in_memory().unwrap();
        store.upsert_bitmap(&key("a", 1, 0), b"x").unwrap();
        store.upsert_bitmap(&key("b", 1, 0), b"x").unwrap();
        store.delete_by_index_name("a").unwrap();
        assert_eq!(store.count_by_index_name("a").unwrap(), 0);
        assert_eq!(store.count_by_index_name("b").unwrap(), 1);
    }

    #[test]
    fn distinct_entities_deduplicates_across_partitions() {
        let store = SqliteDurableStore::open_in_memory().unwrap();
        store.upsert_bitmap(&key("a", 7, 0), b"x").unwrap();
        store.upsert_bitmap(&key("a", 7, 1), b"x").unwrap();
        store.upsert_bitmap(&key("a", 9, 0), b"x").unwrap();
        assert_eq!(store.distinct_entities("a").unwrap(), vec![7, 9]);
    }

    #[test]
    fn granularity_round_trips_through_storage() {
        assert_eq!(parse_granularity("day"), Some(Granularity::Day));
        assert_eq!(parse_granularity("bogus"), None);
    }
}
