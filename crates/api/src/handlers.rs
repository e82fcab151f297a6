//! One handler per row of the route table in `spec.md` §6.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use e4s_core::types::Granularity;

use crate::dto::{
    CreateIndexRequest, ExistsResponse, IndexSummaryResponse, MarkRequest, PointQueryRequest,
    PointResultResponse, ReindexPartitionQuery, ReindexStatusResponse,
};
use crate::error::{not_found, ApiError};
use crate::state::AppState;

fn validate_index_name(name: &str) -> Result<(), ApiError> {
    e4s_core::types::IndexName::validate(name)
        .map_err(|e| ApiError::Validation(e.to_string()))
        .map(|_| ())
}

/// `POST /api/v1/index`
pub async fn create_index(
    State(state): State<AppState>,
    Json(req): Json<CreateIndexRequest>,
) -> Result<StatusCode, ApiError> {
    validate_index_name(&req.index_name)?;
    state.engine.create_index(&req.index_name)?;
    Ok(StatusCode::OK)
}

/// `GET /api/v1/index`
pub async fn list_indexes(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.engine.list_indexes()?))
}

/// `GET /api/v1/index/{name}`
pub async fn get_index(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<IndexSummaryResponse>, ApiError> {
    validate_index_name(&name)?;
    if !state.engine.index_exists(&name)? {
        return Err(not_found(&name));
    }
    let stats = state.engine.stats(&name)?;
    Ok(Json(IndexSummaryResponse {
        name,
        entity_count: stats.entity_count,
        cache_size: stats.cache_size,
        memory_usage_bytes: stats.memory_usage_bytes,
    }))
}

/// `DELETE /api/v1/index/{name}`
pub async fn delete_index(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    validate_index_name(&name)?;
    state.engine.delete_index(&name)?;
    Ok(StatusCode::OK)
}

/// `POST /api/v1/index/exists`
pub async fn exists(
    State(state): State<AppState>,
    Json(req): Json<PointQueryRequest>,
) -> Result<Json<ExistsResponse>, ApiError> {
    let granularity = req.validated()?;
    let found = state
        .engine
        .exists(&req.index_name, req.entity_id, granularity, req.timestamp)?;
    Ok(Json(ExistsResponse {
        index_name: req.index_name,
        entity_id: req.entity_id,
        granularity: granularity.as_upper().to_string(),
        timestamp: req.timestamp,
        exists: found,
    }))
}

/// `POST /api/v1/index/prev`
pub async fn prev(
    State(state): State<AppState>,
    Json(req): Json<PointQueryRequest>,
) -> Result<Json<PointResultResponse>, ApiError> {
    let granularity = req.validated()?;
    let result = state
        .engine
        .find_prev(&req.index_name, req.entity_id, granularity, req.timestamp)?;
    Ok(Json(PointResultResponse {
        index_name: req.index_name,
        entity_id: req.entity_id,
        granularity: granularity.as_upper().to_string(),
        timestamp: req.timestamp,
        result,
    }))
}

/// `POST /api/v1/index/next`
pub async fn next(
    State(state): State<AppState>,
    Json(req): Json<PointQueryRequest>,
) -> Result<Json<PointResultResponse>, ApiError> {
    let granularity = req.validated()?;
    let result = state
        .engine
        .find_next(&req.index_name, req.entity_id, granularity, req.timestamp)?;
    Ok(Json(PointResultResponse {
        index_name: req.index_name,
        entity_id: req.entity_id,
        granularity: granularity.as_upper().to_string(),
        timestamp: req.timestamp,
        result,
    }))
}

/// `POST /api/v1/index/mark`
pub async fn mark(
    State(state): State<AppState>,
    Json(req): Json<MarkRequest>,
) -> Result<StatusCode, ApiError> {
    let granularity = req.validated()?;
    state.engine.mark_batch(
        &req.index_name,
        req.entity_id,
        granularity,
        &req.timestamps,
    )?;
    Ok(StatusCode::OK)
}

/// `DELETE /api/v1/index/{name}/entity/{id}`
pub async fn evict_entity(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    validate_index_name(&name)?;
    state.engine.evict_entity(&name, id)?;
    Ok(StatusCode::OK)
}

/// `DELETE /api/v1/index/{name}/cache`
pub async fn evict_index_cache(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    validate_index_name(&name)?;
    state.engine.evict_index(&name)?;
    Ok(StatusCode::OK)
}

/// `POST /api/v1/admin/index/{name}/reindex`
///
/// A full sweep can touch every entity the durable store holds for this
/// index, so it runs on a blocking-pool thread rather than the async
/// executor, consistent with the thread-based concurrency model `spec.md`
/// §5 describes for the engine itself.
pub async fn reindex(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ReindexStatusResponse>, ApiError> {
    validate_index_name(&name)?;
    let engine = state.engine.clone();
    let status_table = state.reindex_status.clone();
    let run_name = name.clone();
    tokio::task::spawn_blocking(move || engine.reindex_index(&run_name, &status_table))
        .await
        .map_err(|e| ApiError::Validation(format!("reindex task panicked: {e}")))??;
    Ok(Json(state.reindex_status.status(&name).into()))
}

/// `POST /api/v1/admin/index/{name}/reindex/partition`
pub async fn reindex_partition(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ReindexPartitionQuery>,
) -> Result<Json<ReindexStatusResponse>, ApiError> {
    validate_index_name(&name)?;
    let granularity = parse_query_granularity(&query.granularity)?;
    let engine = state.engine.clone();
    let status_table = state.reindex_status.clone();
    let run_name = name.clone();
    let partition = query.partition;
    tokio::task::spawn_blocking(move || {
        engine.reindex_partition(&run_name, granularity, partition, &status_table)
    })
    .await
    .map_err(|e| ApiError::Validation(format!("reindex task panicked: {e}")))??;
    Ok(Json(state.reindex_status.status(&name).into()))
}

/// `GET /api/v1/admin/index/{name}/reindex/status`
pub async fn reindex_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ReindexStatusResponse>, ApiError> {
    validate_index_name(&name)?;
    Ok(Json(state.reindex_status.status(&name).into()))
}

fn parse_query_granularity(raw: &str) -> Result<Granularity, ApiError> {
    crate::dto::parse_granularity(raw)
}
