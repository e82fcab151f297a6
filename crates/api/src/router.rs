//! Builds the [`axum::Router`] from the handlers in [`crate::handlers`].

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Assemble the full HTTP surface documented in `spec.md` §6.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/index",
            post(handlers::create_index).get(handlers::list_indexes),
        )
        .route(
            "/api/v1/index/{name}",
            get(handlers::get_index).delete(handlers::delete_index),
        )
        .route("/api/v1/index/exists", post(handlers::exists))
        .route("/api/v1/index/prev", post(handlers::prev))
        .route("/api/v1/index/next", post(handlers::next))
        .route("/api/v1/index/mark", post(handlers::mark))
        .route(
            "/api/v1/index/{name}/entity/{id}",
            delete(handlers::evict_entity),
        )
        .route(
            "/api/v1/index/{name}/cache",
            delete(handlers::evict_index_cache),
        )
        .route(
            "/api/v1/admin/index/{name}/reindex",
            post(handlers::reindex),
        )
        .route(
            "/api/v1/admin/index/{name}/reindex/partition",
            post(handlers::reindex_partition),
        )
        .route(
            "/api/v1/admin/index/{name}/reindex/status",
            get(handlers::reindex_status),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
