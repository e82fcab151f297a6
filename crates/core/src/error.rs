//! Error types for the e4s-index engine.
//!
//! This crate uses `thiserror` for automatic `Display`/`Error` impls, matching
//! the error style used throughout the rest of the workspace.
//!
//! ## Error kinds
//!
//! - [`Error::NameInvalid`] — index name fails validation. 400-equivalent.
//! - [`Error::NotFound`] — index not present for a lookup that requires it. 404-equivalent.
//! - [`Error::Closed`] — engine is closed. 500-equivalent.
//! - [`Error::Transient`] — fast-store or durable-store call failed with a
//!   retry-eligible condition.
//! - [`Error::Fatal`] — configuration-level or persistent backend error; surfaces
//!   immediately and keeps surfacing on subsequent calls to the same path.
//! - [`Error::Reindex`] — admin reindex path failure, captured in reindex status.
//!
//! Propagation policy: synchronous API paths return the error to the caller.
//! Asynchronous background paths (the write-behind flusher) log and drop —
//! the durable store remains the recovery surface. `close` attempts a final
//! best-effort flush and completes regardless of its outcome.

use thiserror::Error;

/// Result type alias for e4s-index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the e4s-index engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Index name failed validation (`[A-Za-z0-9_-]+`, non-empty).
    #[error("invalid index name: {0}")]
    NameInvalid(String),

    /// The referenced index does not exist.
    #[error("index not found: {0}")]
    NotFound(String),

    /// The engine instance has been closed; no further operations are permitted.
    #[error("engine is closed")]
    Closed,

    /// A fast-store or durable-store call failed with a retry-eligible condition.
    #[error("transient backend error: {0}")]
    Transient(String),

    /// Bitset deserialization failed; the caller-visible effect is documented
    /// per call site (treated as empty on read, substituted with empty on
    /// load-for-write). This variant exists for the one-time structured log,
    /// it is not normally propagated to callers.
    #[error("corrupt bitset at {0}")]
    CorruptBitset(String),

    /// Configuration-level or persistent backend error (bad schema, auth
    /// failure). Surfaces immediately and subsequent operations on the
    /// affected path continue to fail.
    #[error("fatal backend error: {0}")]
    Fatal(String),

    /// Admin reindex operation failed.
    #[error("reindex failed: {0}")]
    Reindex(String),
}

impl Error {
    /// True if the error represents a condition worth retrying (vs. a
    /// permanent failure the caller should not immediately repeat).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}
