//! Fast-store client (C4) and bounded hot cache (C7) for e4s-index.
//!
//! `kv` defines the byte-keyed, byte-valued remote store contract the
//! engine writes through and caches in front of; `cache` is the
//! insertion-ordered, capacity-limited map the engine keeps partition
//! bitsets in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod kv;

pub use cache::BoundedCache;
pub use kv::{InMemoryKvStore, KvStoreClient};

#[cfg(feature = "redis-backend")]
pub use kv::RedisKvStore;
