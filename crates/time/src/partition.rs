//! Mapping between (value, granularity) and (partition, in-partition offset),
//! plus adjacent-partition key derivation (C2).
//!
//! The partition size table is fixed: changing it is a backward-incompatible
//! storage change, since it changes which values share a [`KvKey`].

use e4s_core::{EntityId, EpochValue, Granularity, IndexName, KvKey, Partition};

/// Partition width, in epoch-value units, for each granularity.
///
/// `DAY = 180`, `MONTH = 6`, `YEAR = 1`. Fixed by `spec.md` §2/§4.2.
pub fn partition_size(granularity: Granularity) -> EpochValue {
    match granularity {
        Granularity::Day => 180,
        Granularity::Month => 6,
        Granularity::Year => 1,
    }
}

/// The partition number containing `value`: `floor(value / P(G))`.
pub fn partition_of(value: EpochValue, granularity: Granularity) -> Partition {
    (value / partition_size(granularity)) as Partition
}

/// The in-partition offset of `value`: `value mod P(G)` (always `0` for YEAR).
pub fn offset_of(value: EpochValue, granularity: Granularity) -> EpochValue {
    value % partition_size(granularity)
}

/// The first epoch value belonging to partition `p`.
pub fn partition_start(p: Partition, granularity: Granularity) -> EpochValue {
    (p as EpochValue) * partition_size(granularity)
}

/// Build the canonical [`KvKey`] for the partition holding `value`.
pub fn key_for_value(
    index: &IndexName,
    granularity: Granularity,
    entity: EntityId,
    value: EpochValue,
) -> KvKey {
    key(index, granularity, entity, partition_of(value, granularity))
}

/// Build the canonical [`KvKey`] for an explicit partition number.
pub fn key(
    index: &IndexName,
    granularity: Granularity,
    entity: EntityId,
    partition: Partition,
) -> KvKey {
    KvKey::new(index, granularity, entity, partition)
}

/// The key of the partition immediately before `value`'s partition, or
/// `None` if `value`'s partition is `0` (there is no partition `-1`).
pub fn prev_partition_key(
    index: &IndexName,
    granularity: Granularity,
    entity: EntityId,
    value: EpochValue,
) -> Option<KvKey> {
    let p = partition_of(value, granularity);
    if p == 0 {
        None
    } else {
        Some(key(index, granularity, entity, p - 1))
    }
}

/// The key of the partition immediately after `value`'s partition. Always
/// defined — partition numbers have no upper bound.
pub fn next_partition_key(
    index: &IndexName,
    granularity: Granularity,
    entity: EntityId,
    value: EpochValue,
) -> KvKey {
    let p = partition_of(value, granularity);
    key(index, granularity, entity, p + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx() -> IndexName {
        IndexName::new("meter-data").unwrap()
    }

    #[test]
    fn partition_boundary_scenario() {
        // spec.md §8: partitionOf(20159) == 111, partitionOf(20160) == 112
        assert_eq!(partition_of(20159, Granularity::Day), 111);
        assert_eq!(partition_of(20160, Granularity::Day), 112);
        assert_eq!(partition_of(20178, Granularity::Day), 112);
    }

    #[test]
    fn year_partitions_are_width_one() {
        assert_eq!(partition_of(0, Granularity::Year), 0);
        assert_eq!(partition_of(1, Granularity::Year), 1);
        assert_eq!(offset_of(5, Granularity::Year), 0);
    }

    #[test]
    fn prev_partition_key_is_none_at_partition_zero() {
        assert!(prev_partition_key(&idx(), Granularity::Day, 1, 179).is_none());
        assert!(prev_partition_key(&idx(), Granularity::Day, 1, 180).is_some());
    }

    #[test]
    fn next_partition_key_always_defined() {
        let k = next_partition_key(&idx(), Granularity::Day, 1, 0);
        assert_eq!(k.as_str(), "e4s:index:meter-data:day:1:1");
    }

    #[test]
    fn key_for_value_matches_manual_partition() {
        let k1 = key_for_value(&idx(), Granularity::Day, 12345, 20175);
        let k2 = key(&idx(), Granularity::Day, 12345, 112);
        assert_eq!(k1, k2);
    }
}
