//! Shared application state handed to every handler via [`axum::extract::State`].

use std::sync::Arc;

use e4s_durability::ReindexStatusStore;
use e4s_engine::IndexEngine;

/// Cloneable handle to the engine and the admin reindex-progress table.
///
/// `IndexEngine` is already `Arc`-wrapped by [`IndexEngine::new`]; this
/// struct just bundles it with the reindex status table, which lives
/// outside the engine because it is an admin/API-layer concern
/// (`spec.md` §6's `reindex_status` table), not part of C9 itself.
#[derive(Clone)]
pub struct AppState {
    /// The index engine.
    pub engine: Arc<IndexEngine>,
    /// Per-index admin reindex progress.
    pub reindex_status: Arc<ReindexStatusStore>,
}

impl AppState {
    /// Build state from an already-constructed engine.
    pub fn new(engine: Arc<IndexEngine>) -> Self {
        Self {
            engine,
            reindex_status: Arc::new(ReindexStatusStore::new()),
        }
    }
}
