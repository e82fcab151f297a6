//! Compressed bitset of non-negative 32-bit integers (C3).
//!
//! Backed by [`roaring::RoaringBitmap`], which gives O(1) cardinality and
//! container-indexed rank/select operations — the primitive this module
//! builds `prev_of`/`next_of` on top of.

#![warn(missing_docs)]
#![warn(clippy::all)]

use roaring::RoaringBitmap;
use std::io;
use thiserror::Error;

/// Error deserializing a [`Bitset`] from bytes.
#[derive(Debug, Error)]
pub enum BitsetError {
    /// The byte stream was not a valid serialized bitmap.
    #[error("corrupt bitset bytes: {0}")]
    Corrupt(#[from] io::Error),
}

/// A compressed set of non-negative 32-bit integers.
///
/// Invariants: deterministic serialization modulo equal-set equality;
/// `prev_of`/`next_of` use *strict* inequality — a present value is never
/// returned by a query for itself.
#[derive(Debug, Clone, Default)]
pub struct Bitset {
    inner: RoaringBitmap,
}

impl Bitset {
    /// An empty bitset.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `v` is a member.
    pub fn contains(&self, v: u32) -> bool {
        self.inner.contains(v)
    }

    /// Add `v`. Idempotent.
    pub fn add(&mut self, v: u32) {
        self.inner.insert(v);
    }

    /// Add every value in `vs`. Equivalent to a sequence of [`Self::add`].
    pub fn add_all(&mut self, vs: impl IntoIterator<Item = u32>) {
        for v in vs {
            self.inner.insert(v);
        }
    }

    /// The largest member strictly less than `v`, or `None`.
    pub fn prev_of(&self, v: u32) -> Option<u32> {
        if v == 0 {
            return None;
        }
        let rank = self.inner.rank(v - 1); // count of members <= v-1, i.e. < v
        if rank == 0 {
            None
        } else {
            self.inner.select(rank as u32 - 1)
        }
    }

    /// The smallest member strictly greater than `v`, or `None`.
    pub fn next_of(&self, v: u32) -> Option<u32> {
        let rank = self.inner.rank(v); // count of members <= v
        if rank >= self.inner.len() {
            None
        } else {
            self.inner.select(rank as u32)
        }
    }

    /// Number of members. O(1).
    pub fn cardinality(&self) -> u64 {
        self.inner.len()
    }

    /// The greatest member, or `None` if empty. Used by cross-partition
    /// navigation to read the boundary value of an adjacent partition.
    pub fn max(&self) -> Option<u32> {
        self.inner.max()
    }

    /// The smallest member, or `None` if empty. Symmetric to [`Self::max`].
    pub fn min(&self) -> Option<u32> {
        self.inner.min()
    }

    /// Approximate retained size in bytes. O(1).
    pub fn size_in_bytes(&self) -> usize {
        self.inner.serialized_size()
    }

    /// Members in ascending order.
    pub fn to_array(&self) -> Vec<u32> {
        self.inner.iter().collect()
    }

    /// Serialize to the roaring on-disk format. Stable across versions and
    /// an inverse of [`Self::deserialize`].
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.inner.serialized_size());
        self.inner
            .serialize_into(&mut buf)
            .expect("writing to a Vec<u8> cannot fail");
        buf
    }

    /// Deserialize from bytes produced by [`Self::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, BitsetError> {
        let inner = RoaringBitmap::deserialize_from(bytes)?;
        Ok(Self { inner })
    }

    /// Union this bitset with `other` in place. Used by the write-behind
    /// flusher's pending-durable-map coalescing, which merges repeated
    /// writes to the same durable key via union.
    pub fn union_with(&mut self, other: &Bitset) {
        self.inner |= &other.inner;
    }
}

impl PartialEq for Bitset {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}
impl Eq for Bitset {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn contains_reflects_add() {
        let mut b = Bitset::new();
        assert!(!b.contains(5));
        b.add(5);
        assert!(b.contains(5));
    }

    #[test]
    fn add_is_idempotent() {
        let mut b = Bitset::new();
        b.add(7);
        b.add(7);
        assert_eq!(b.cardinality(), 1);
    }

    #[test]
    fn prev_and_next_are_strict() {
        let mut b = Bitset::new();
        b.add_all([10, 20, 30]);
        assert_eq!(b.prev_of(20), Some(10));
        assert_eq!(b.next_of(20), Some(30));
        assert_ne!(b.prev_of(20), Some(20));
        assert_ne!(b.next_of(20), Some(20));
        assert_eq!(b.prev_of(10), None);
        assert_eq!(b.next_of(30), None);
    }

    #[test]
    fn prev_of_zero_is_none() {
        let mut b = Bitset::new();
        b.add(0);
        assert_eq!(b.prev_of(0), None);
    }

    #[test]
    fn serialize_deserialize_round_trips() {
        let mut b = Bitset::new();
        b.add_all([1, 2, 1000, 70000]);
        let bytes = b.serialize();
        let restored = Bitset::deserialize(&bytes).unwrap();
        assert_eq!(b, restored);
    }

    #[test]
    fn deserialize_rejects_garbage() {
        let garbage = vec![0xFF, 0x00, 0x01, 0x02];
        assert!(Bitset::deserialize(&garbage).is_err());
    }

    #[test]
    fn max_and_min_reflect_extremes() {
        let mut b = Bitset::new();
        assert_eq!(b.max(), None);
        assert_eq!(b.min(), None);
        b.add_all([5, 1, 3]);
        assert_eq!(b.max(), Some(5));
        assert_eq!(b.min(), Some(1));
    }

    #[test]
    fn to_array_is_ascending() {
        let mut b = Bitset::new();
        b.add_all([5, 1, 3]);
        assert_eq!(b.to_array(), vec![1, 3, 5]);
    }

    #[test]
    fn union_with_is_commutative_union() {
        let mut a = Bitset::new();
        a.add_all([1, 2]);
        let mut b = Bitset::new();
        b.add_all([2, 3]);
        a.union_with(&b);
        assert_eq!(a.to_array(), vec![1, 2, 3]);
    }

    proptest! {
        #[test]
        fn prev_of_never_returns_self_or_greater(values: Vec<u32>, query in 0u32..100_000) {
            let mut b = Bitset::new();
            b.add_all(values.iter().copied());
            if let Some(p) = b.prev_of(query) {
                prop_assert!(p < query);
                prop_assert!(b.contains(p));
            }
        }

        #[test]
        fn next_of_never_returns_self_or_less(values: Vec<u32>, query in 0u32..100_000) {
            let mut b = Bitset::new();
            b.add_all(values.iter().copied());
            if let Some(n) = b.next_of(query) {
                prop_assert!(n > query);
                prop_assert!(b.contains(n));
            }
        }
    }
}
