//! Epoch codec (C1) and partitioner (C2) for e4s-index.
//!
//! Pure, I/O-free functions. `epoch` converts wall-clock milliseconds to/from
//! per-granularity integer values; `partition` maps those values to the
//! fixed-size storage partitions the engine locks and caches by.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod epoch;
pub mod partition;

pub use epoch::{from_epoch, to_epoch, EpochCodecError};
pub use partition::{
    key, key_for_value, next_partition_key, partition_of, partition_size, partition_start,
    prev_partition_key,
};
