//! HTTP surface for e4s-index (`spec.md` §6): a thin `axum` layer translating
//! JSON requests into [`e4s_engine::IndexEngine`] calls.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
