//! Audit trail endpoint

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::AuditRow;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuditParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /api/v1/audit/{prefix}
pub async fn audit_trail(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
    Query(params): Query<AuditParams>,
) -> AppResult<Json<ApiResponse<Vec<AuditRow>>>> {
    let rows = state
        .service
        .audit_page(&prefix, params.limit, params.offset)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
