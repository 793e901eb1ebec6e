//! Issuance endpoints

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::{BatchRequest, BatchResponse, IssuedId};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NextParams {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub generated_by: String,
    pub correlation_id: Option<String>,
}

/// GET /api/v1/next/{prefix}
pub async fn next_id(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
    Query(params): Query<NextParams>,
) -> AppResult<Json<ApiResponse<IssuedId>>> {
    let issued = state
        .service
        .issue(
            &prefix,
            &params.client_id,
            &params.generated_by,
            params.correlation_id,
        )
        .await?;
    Ok(Json(ApiResponse::success(issued)))
}

/// POST /api/v1/batch/{prefix}
pub async fn next_batch(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
    Json(req): Json<BatchRequest>,
) -> AppResult<Json<ApiResponse<BatchResponse>>> {
    let response = state.service.issue_batch(&prefix, req).await?;
    Ok(Json(ApiResponse::success(response)))
}
