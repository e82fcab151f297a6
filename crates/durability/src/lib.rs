//! Durable store client (C5): source-of-truth per-partition bitmap storage
//! over a relational backend, plus admin reindex progress tracking.
//!
//! Logical schema (`spec.md` §6): table `meter_index_partitioned` keyed by
//! the unique tuple `(index_name, entity_id, granularity, partition_num)`,
//! plus a companion `reindex_status` table for admin progress. [`MemoryDurableStore`]
//! is the always-on reference implementation; [`SqliteDurableStore`] (feature
//! `sqlite-backend`) is the real backend, built on `rusqlite`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod reindex;

#[cfg(feature = "sqlite-backend")]
pub mod sqlite;

use e4s_core::error::Result;
use e4s_core::types::{EntityId, Granularity, Partition};

pub use memory::MemoryDurableStore;
pub use reindex::{ReindexStatus, ReindexStatusStore};

#[cfg(feature = "sqlite-backend")]
pub use sqlite::SqliteDurableStore;

/// Identity of a single stored bitmap row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitmapKey {
    /// Owning index name.
    pub index_name: String,
    /// Entity the bitmap tracks.
    pub entity_id: EntityId,
    /// Temporal granularity.
    pub granularity: Granularity,
    /// Partition number within that granularity.
    pub partition: Partition,
}

impl BitmapKey {
    /// Build a new key identity.
    pub fn new(
        index_name: impl Into<String>,
        entity_id: EntityId,
        granularity: Granularity,
        partition: Partition,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            entity_id,
            granularity,
            partition,
        }
    }
}

/// Source-of-truth relational store for per-partition bitmap blobs (C5).
///
/// Every call may return [`e4s_core::Error::Transient`] on a retryable
/// connection failure, or [`e4s_core::Error::Fatal`] on a persistent
/// configuration-level failure (bad schema, auth). Callers treat this as an
/// external collaborator reached only through this trait.
pub trait DurableStoreClient: Send + Sync {
    /// Fetch the raw bitmap bytes stored at `key`, or `None` if absent.
    fn get_bitmap(&self, key: &BitmapKey) -> Result<Option<Vec<u8>>>;

    /// Insert-or-replace the bitmap bytes stored at `key`.
    fn upsert_bitmap(&self, key: &BitmapKey, bytes: &[u8]) -> Result<()>;

    /// Delete the row at `key`, if present. Missing rows are not an error.
    fn delete_bitmap(&self, key: &BitmapKey) -> Result<()>;

    /// Delete every row belonging to `index_name`.
    fn delete_by_index_name(&self, index_name: &str) -> Result<()>;

    /// Count of rows belonging to `index_name`.
    fn count_by_index_name(&self, index_name: &str) -> Result<u64>;

    /// Distinct entity ids with at least one row under `index_name`.
    fn distinct_entities(&self, index_name: &str) -> Result<Vec<EntityId>>;

    /// All entity ids with at least one row under `index_name`, without
    /// deduplication guarantees beyond [`DurableStoreClient::distinct_entities`]
    /// (kept as a distinct operation per `spec.md` §4.5's method list, used by
    /// reindex sweeps that page through entities).
    fn find_entity_ids(&self, index_name: &str) -> Result<Vec<EntityId>>;

    /// All stored partitions for `(index_name, entity_id, granularity)`.
    fn find_partitions(
        &self,
        index_name: &str,
        entity_id: EntityId,
        granularity: Granularity,
    ) -> Result<Vec<Partition>>;
}
