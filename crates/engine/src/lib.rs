//! Write-behind flusher (C8) and index engine (C9) for e4s-index.
//!
//! [`IndexEngine`] is the public entry point; it owns the key-lock table,
//! the hot cache, and a [`WriteBehindFlusher`] and orchestrates every other
//! component crate behind the twelve operations documented in `spec.md` §4.9.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod flusher;
pub mod stats;

pub use engine::IndexEngine;
pub use flusher::WriteBehindFlusher;
pub use stats::IndexStats;
