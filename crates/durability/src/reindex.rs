//! Admin reindex progress tracking (`reindex_status` table, `spec.md` §6).
//!
//! Reindexing itself (replaying durable rows back into the fast store) is
//! driven by the engine; this module only owns the progress record an admin
//! can poll via `GET /api/v1/admin/index/{name}/reindex/status`.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Lifecycle state of a reindex run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexState {
    /// No reindex has ever run for this index.
    Idle,
    /// A reindex is currently in progress.
    Running,
    /// The most recent reindex completed successfully.
    Completed,
    /// The most recent reindex failed; `message` on [`ReindexStatus`] carries
    /// the [`e4s_core::Error::Reindex`] detail.
    Failed,
}

/// Progress snapshot for one index's reindex run.
#[derive(Debug, Clone)]
pub struct ReindexStatus {
    /// Current lifecycle state.
    pub state: ReindexState,
    /// Entities processed so far.
    pub entities_processed: u64,
    /// Total entities discovered for this run, once known.
    pub entities_total: Option<u64>,
    /// Failure detail, set only when `state == Failed`.
    pub message: Option<String>,
}

impl ReindexStatus {
    fn idle() -> Self {
        Self {
            state: ReindexState::Idle,
            entities_processed: 0,
            entities_total: None,
            message: None,
        }
    }
}

/// Process-global table of per-index reindex progress: a shared,
/// mutex-guarded status map updated by a worker and polled by callers.
#[derive(Default)]
pub struct ReindexStatusStore {
    statuses: Mutex<HashMap<String, ReindexStatus>>,
}

impl ReindexStatusStore {
    /// An empty status table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status for `index_name`, defaulting to [`ReindexState::Idle`]
    /// if no run has ever been recorded.
    pub fn status(&self, index_name: &str) -> ReindexStatus {
        self.statuses
            .lock()
            .get(index_name)
            .cloned()
            .unwrap_or_else(ReindexStatus::idle)
    }

    /// Mark `index_name` as starting a fresh run against `entities_total`
    /// entities (when known up front).
    pub fn start(&self, index_name: &str, entities_total: Option<u64>) {
        self.statuses.lock().insert(
            index_name.to_string(),
            ReindexStatus {
                state: ReindexState::Running,
                entities_processed: 0,
                entities_total,
                message: None,
            },
        );
    }

    /// Advance the processed-entity counter for a running reindex.
    pub fn advance(&self, index_name: &str, processed: u64) {
        if let Some(status) = self.statuses.lock().get_mut(index_name) {
            status.entities_processed = processed;
        }
    }

    /// Mark the run for `index_name` as completed.
    pub fn complete(&self, index_name: &str) {
        if let Some(status) = self.statuses.lock().get_mut(index_name) {
            status.state = ReindexState::Completed;
        }
    }

    /// Mark the run for `index_name` as failed with `message`.
    pub fn fail(&self, index_name: &str, message: impl Into<String>) {
        if let Some(status) = self.statuses.lock().get_mut(index_name) {
            status.state = ReindexState::Failed;
            status.message = Some(message.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_index_is_idle() {
        let store = ReindexStatusStore::new();
        assert_eq!(store.status("unknown").state, ReindexState::Idle);
    }

    #[test]
    fn lifecycle_transitions_are_tracked() {
        let store = ReindexStatusStore::new();
        store.start("a", Some(10));
        assert_eq!(store.status("a").state, ReindexState::Running);
        store.advance("a", 4);
        assert_eq!(store.status("a").entities_processed, 4);
        store.complete("a");
        assert_eq!(store.status("a").state, ReindexState::Completed);
    }

    #[test]
    fn failure_carries_message() {
        let store = ReindexStatusStore::new();
        store.start("a", None);
        store.fail("a", "connection refused");
        let status = store.status("a");
        assert_eq!(status.state, ReindexState::Failed);
        assert_eq!(status.message.as_deref(), Some("connection refused"));
    }
}
