//! JSON request/response bodies for the HTTP surface (`spec.md` §6).
//!
//! Every body uses `camelCase` wire names; timestamps transport as signed
//! 64-bit epoch milliseconds and granularity as one of `"DAY"`/`"MONTH"`/`"YEAR"`.

use serde::{Deserialize, Serialize};

use e4s_core::types::{EntityId, Granularity};

use crate::error::ApiError;

/// Parse a wire granularity string, case-sensitively, into [`Granularity`].
pub fn parse_granularity(raw: &str) -> Result<Granularity, ApiError> {
    Granularity::parse_upper(raw).ok_or_else(|| {
        ApiError::Validation(format!(
            "granularity must be one of DAY, MONTH, YEAR, got {raw:?}"
        ))
    })
}

fn require_positive(field: &str, value: i64) -> Result<(), ApiError> {
    if value <= 0 {
        return Err(ApiError::Validation(format!(
            "{field} must be a positive epoch-millisecond timestamp"
        )));
    }
    Ok(())
}

/// `POST /api/v1/index` body.
#[derive(Debug, Deserialize)]
pub struct CreateIndexRequest {
    /// Name to register. Validated again by the engine against the same
    /// charset; this is just where the error path is named.
    #[serde(rename = "indexName")]
    pub index_name: String,
}

/// `GET /api/v1/index/{name}` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummaryResponse {
    /// Index name.
    pub name: String,
    /// Coarse entity-count proxy (`spec.md` §9).
    pub entity_count: u64,
    /// Number of this index's partition bitsets currently cached.
    pub cache_size: usize,
    /// Best-effort cached-bitset memory estimate.
    pub memory_usage_bytes: usize,
}

/// Shared body shape for `exists`/`prev`/`next`: `{indexName, entityId,
/// granularity, timestamp}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointQueryRequest {
    /// Index to query.
    pub index_name: String,
    /// Entity within that index.
    pub entity_id: EntityId,
    /// Temporal granularity, `"DAY"`/`"MONTH"`/`"YEAR"`.
    pub granularity: String,
    /// Epoch-millisecond timestamp. Must be positive.
    pub timestamp: i64,
}

impl PointQueryRequest {
    /// Validate `timestamp` is positive and `granularity` parses.
    pub fn validated(&self) -> Result<Granularity, ApiError> {
        require_positive("timestamp", self.timestamp)?;
        parse_granularity(&self.granularity)
    }
}

/// `POST /api/v1/index/exists` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistsResponse {
    /// Echoed index name.
    pub index_name: String,
    /// Echoed entity id.
    pub entity_id: EntityId,
    /// Echoed granularity.
    pub granularity: String,
    /// Echoed timestamp.
    pub timestamp: i64,
    /// Whether `timestamp` is marked.
    pub exists: bool,
}

/// `POST /api/v1/index/prev` and `/next` response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointResultResponse {
    /// Echoed index name.
    pub index_name: String,
    /// Echoed entity id.
    pub entity_id: EntityId,
    /// Echoed granularity.
    pub granularity: String,
    /// Echoed timestamp.
    pub timestamp: i64,
    /// The found neighboring value, or `null` if none.
    pub result: Option<i64>,
}

/// `POST /api/v1/index/mark` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    /// Index to mark into.
    pub index_name: String,
    /// Entity within that index.
    pub entity_id: EntityId,
    /// Temporal granularity.
    pub granularity: String,
    /// Epoch-millisecond timestamps to add. Must all be positive and non-empty.
    pub timestamps: Vec<i64>,
}

impl MarkRequest {
    /// Validate `granularity` parses and every timestamp is positive.
    pub fn validated(&self) -> Result<Granularity, ApiError> {
        if self.timestamps.is_empty() {
            return Err(ApiError::Validation(
                "timestamps must contain at least one value".to_string(),
            ));
        }
        for &ts in &self.timestamps {
            require_positive("timestamps[]", ts)?;
        }
        parse_granularity(&self.granularity)
    }
}

/// Query string for `POST /api/v1/admin/index/{name}/reindex/partition`.
#[derive(Debug, Deserialize)]
pub struct ReindexPartitionQuery {
    /// Partition number to replay.
    pub partition: i64,
    /// Granularity the partition number is relative to.
    pub granularity: String,
}

/// Response body shared by all three admin reindex endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexStatusResponse {
    /// `"IDLE"`, `"RUNNING"`, `"COMPLETED"`, or `"FAILED"`.
    pub status: String,
    /// Entities processed so far in the current or most recent run.
    pub entities_processed: u64,
    /// Total entities discovered for the run, once known.
    pub entities_total: Option<u64>,
    /// Failure detail, present only when `status == "FAILED"`.
    pub message: Option<String>,
}

impl From<e4s_durability::ReindexStatus> for ReindexStatusResponse {
    fn from(status: e4s_durability::ReindexStatus) -> Self {
        let label = match status.state {
            e4s_durability::ReindexState::Idle => "IDLE",
            e4s_durability::ReindexState::Running => "RUNNING",
            e4s_durability::ReindexState::Completed => "COMPLETED",
            e4s_durability::ReindexState::Failed => "FAILED",
        };
        Self {
            status: label.to_string(),
            entities_processed: status.entities_processed,
            entities_total: status.entities_total,
            message: status.message,
        }
    }
}
