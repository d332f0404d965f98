//! Admin endpoints: workbook import, audit listing, classify preview and
//! snapshot summary

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use svs_common::audit::AuditPage;
use svs_common::import::Workbook;
use svs_common::Verdict;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/import
///
/// Body is a serialized workbook. A structural failure answers 422 with the
/// import result so the caller can see which columns were missing.
pub async fn import_workbook(
    State(state): State<AppState>,
    Json(workbook): Json<Workbook>,
) -> ApiResult<Response> {
    info!(sheets = workbook.sheets.len(), "Admin import requested");

    let result = state.pipeline.import_workbook(&workbook).await?;

    if result.is_structural_failure() {
        warn!("Import rejected, previous table stays published");
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(result)).into_response());
    }

    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_page")]
    page: i64,
}

fn default_page() -> i64 {
    1
}

/// GET /api/audit?page=N
pub async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<AuditPage>> {
    Ok(Json(state.store.list_audit(query.page).await?))
}

#[derive(Debug, Deserialize)]
pub struct ClassifyQuery {
    serial: Option<String>,
}

/// GET /api/classify?serial=..
///
/// Classifies without auditing or notifying.
pub async fn classify_preview(
    State(state): State<AppState>,
    Query(query): Query<ClassifyQuery>,
) -> ApiResult<Json<Verdict>> {
    let serial = query
        .serial
        .ok_or_else(|| ApiError::BadRequest("missing 'serial' query parameter".to_string()))?;

    Ok(Json(state.classifier.classify(&serial)))
}

#[derive(Debug, Serialize)]
pub struct SnapshotSummary {
    pub version: u64,
    pub range_count: usize,
    pub invalid_count: usize,
}

/// GET /api/snapshot
pub async fn snapshot_summary(State(state): State<AppState>) -> Json<SnapshotSummary> {
    let table = state.classifier.snapshot().load();

    Json(SnapshotSummary {
        version: table.version(),
        range_count: table.range_count(),
        invalid_count: table.invalid_count(),
    })
}
