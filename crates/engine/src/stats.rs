//! Process-local, best-effort statistics surfaced by `IndexEngine::stats`.

/// Snapshot returned by `GET /api/v1/index/{name}` and the engine's
/// `stats` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    /// Coarse, fast proxy: distinct DAY-granularity keys in the fast store
    /// for this index. Not the true count of entities known to the system
    /// — durable-only entities are invisible to this count (`spec.md` §9).
    pub entity_count: u64,
    /// Number of this index's partition bitsets currently cached.
    pub cache_size: usize,
    /// Best-effort estimate of the cached bitsets' retained memory.
    pub memory_usage_bytes: usize,
}
