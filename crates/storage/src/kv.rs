//! KV store client (C4): a byte-keyed, byte-valued fast store.
//!
//! The engine treats this as an external collaborator reached only through
//! this trait. [`InMemoryKvStore`] is the reference implementation used by
//! every engine test; [`RedisKvStore`] (behind the `redis-backend` feature)
//! is a real backend, grounded on the `redis` crate the way the pack's
//! `dolos-redis` crate uses it as a fast external store.

use std::collections::HashSet;

use dashmap::DashMap;
use e4s_core::error::{Error, Result};

/// Byte-keyed, byte-valued fast store plus registry-style sets.
///
/// All calls may fail with [`Error::Transient`] on a retry-eligible
/// condition (network blip, connection reset); callers are responsible for
/// deciding whether to retry, per `spec.md` §7's propagation policy.
pub trait KvStoreClient: Send + Sync {
    /// Fetch the bytes stored at `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` at `key`, overwriting any existing value.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete every key in `keys`. Missing keys are not an error.
    fn delete(&self, keys: &[String]) -> Result<()>;

    /// Add `member` to the set at `set_key`.
    fn set_add(&self, set_key: &str, member: &str) -> Result<()>;

    /// Remove `member` from the set at `set_key`.
    fn set_remove(&self, set_key: &str, member: &str) -> Result<()>;

    /// `true` if `member` is in the set at `set_key`.
    fn set_is_member(&self, set_key: &str, member: &str) -> Result<bool>;

    /// All members of the set at `set_key`.
    fn set_members(&self, set_key: &str) -> Result<HashSet<String>>;

    /// All keys beginning with `prefix`. Used by `deleteIndex` and
    /// `entityCount`.
    fn scan_keys(&self, prefix: &str) -> Result<HashSet<String>>;
}

enum StoredEntry {
    Value(Vec<u8>),
    Set(HashSet<String>),
}

/// In-memory reference implementation of [`KvStoreClient`].
///
/// A simple, obviously-correct implementation used to exercise the
/// engine's contract in tests without a live Redis.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: DashMap<String, StoredEntry>,
}

impl InMemoryKvStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStoreClient for InMemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).and_then(|e| match e.value() {
            StoredEntry::Value(bytes) => Some(bytes.clone()),
            StoredEntry::Set(_) => None,
        }))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .insert(key.to_string(), StoredEntry::Value(value.to_vec()));
        Ok(())
    }

    fn delete(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    fn set_add(&self, set_key: &str, member: &str) -> Result<()> {
        self.entries
            .entry(set_key.to_string())
            .and_modify(|e| {
                if let StoredEntry::Set(members) = e {
                    members.insert(member.to_string());
                }
            })
            .or_insert_with(|| StoredEntry::Set(HashSet::from([member.to_string()])));
        Ok(())
    }

    fn set_remove(&self, set_key: &str, member: &str) -> Result<()> {
        if let Some(mut e) = self.entries.get_mut(set_key) {
            if let StoredEntry::Set(members) = e.value_mut() {
                members.remove(member);
            }
        }
        Ok(())
    }

    fn set_is_member(&self, set_key: &str, member: &str) -> Result<bool> {
        Ok(self.entries.get(set_key).is_some_and(|e| match e.value() {
            StoredEntry::Set(members) => members.contains(member),
            StoredEntry::Value(_) => false,
        }))
    }

    fn set_members(&self, set_key: &str) -> Result<HashSet<String>> {
        Ok(self
            .entries
            .get(set_key)
            .map(|e| match e.value() {
                StoredEntry::Set(members) => members.clone(),
                StoredEntry::Value(_) => HashSet::new(),
            })
            .unwrap_or_default())
    }

    fn scan_keys(&self, prefix: &str) -> Result<HashSet<String>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect())
    }
}

#[cfg(feature = "redis-backend")]
mod redis_backend {
    use super::*;
    use parking_lot::Mutex;
    use redis::Commands;

    /// Real fast-store backend over a Redis-compatible server.
    ///
    /// Uses a single synchronous connection behind a mutex, matching the
    /// engine's "parallel OS threads" concurrency model (`spec.md` §5) —
    /// there is no async runtime in the core engine, so the client does
    /// not need one either.
    pub struct RedisKvStore {
        conn: Mutex<redis::Connection>,
    }

    impl RedisKvStore {
        /// Connect to `url` (e.g. `"redis://127.0.0.1/"`).
        pub fn connect(url: &str) -> Result<Self> {
            let client = redis::Client::open(url)
                .map_err(|e| Error::Fatal(format!("invalid redis url: {e}")))?;
            let conn = client
                .get_connection()
                .map_err(|e| Error::Transient(format!("redis connect failed: {e}")))?;
            Ok(Self {
                conn: Mutex::new(conn),
            })
        }

        fn map_err(e: redis::RedisError) -> Error {
            Error::Transient(format!("redis error: {e}"))
        }
    }

    impl KvStoreClient for RedisKvStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.conn.lock().get(key).map_err(Self::map_err)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<()> {
            self.conn.lock().set(key, value).map_err(Self::map_err)
        }

        fn delete(&self, keys: &[String]) -> Result<()> {
            if keys.is_empty() {
                return Ok(());
            }
            self.conn.lock().del(keys).map_err(Self::map_err)
        }

        fn set_add(&self, set_key: &str, member: &str) -> Result<()> {
            self.conn.lock().sadd(set_key, member).map_err(Self::map_err)
        }

        fn set_remove(&self, set_key: &str, member: &str) -> Result<()> {
            self.conn.lock().srem(set_key, member).map_err(Self::map_err)
        }

        fn set_is_member(&self, set_key: &str, member: &str) -> Result<bool> {
            self.conn.lock().sismember(set_key, member).map_err(Self::map_err)
        }

        fn set_members(&self, set_key: &str) -> Result<HashSet<String>> {
            self.conn.lock().smembers(set_key).map_err(Self::map_err)
        }

        fn scan_keys(&self, prefix: &str) -> Result<HashSet<String>> {
            let pattern = format!("{prefix}*");
            let keys: Vec<String> = self
                .conn
                .lock()
                .scan_match(&pattern)
                .map_err(Self::map_err)?
                .collect();
            Ok(keys.into_iter().collect())
        }
    }
}

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisKvStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_delete_round_trip() {
        let store = InMemoryKvStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", b"v1").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v1".to_vec()));
        store.delete(&["k".to_string()]).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn set_operations_round_trip() {
        let store = InMemoryKvStore::new();
        store.set_add("s", "a").unwrap();
        store.set_add("s", "b").unwrap();
        assert!(store.set_is_member("s", "a").unwrap());
        assert!(!store.set_is_member("s", "z").unwrap());
        assert_eq!(
            store.set_members("s").unwrap(),
            HashSet::from(["a".to_string(), "b".to_string()])
        );
        store.set_remove("s", "a").unwrap();
        assert!(!store.set_is_member("s", "a").unwrap());
    }

    #[test]
    fn scan_keys_matches_prefix_only() {
        let store = InMemoryKvStore::new();
        store.set("e4s:index:a:day:1:0", b"x").unwrap();
        store.set("e4s:index:a:day:1:1", b"x").unwrap();
        store.set("e4s:index:b:day:1:0", b"x").unwrap();
        let matches = store.scan_keys("e4s:index:a:").unwrap();
        assert_eq!(matches.len(), 2);
    }
}
