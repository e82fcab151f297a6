//! Core types shared across the e4s-index crates.
//!
//! This crate defines the foundational vocabulary of the engine:
//! - [`Granularity`]: DAY/MONTH/YEAR temporal quantization
//! - [`IndexName`]: validated tenant/namespace identifier
//! - [`EntityId`] / [`EpochValue`]: the value domain
//! - [`KvKey`]: the canonical string identity of a partition bitset
//! - [`Error`]: the unified error type returned by every public operation
//! - [`config`]: `e4s.toml`-backed configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod types;

pub use config::E4sConfig;
pub use error::{Error, Result};
pub use types::{EntityId, EpochValue, Granularity, IndexName, IndexNameError, KvKey, Partition};
