//! Administrative reset endpoint

use axum::extract::{Path, State};
use axum::Json;
use shared::error::{ApiResponse, AppResult};
use shared::models::{ResetRequest, ResetResponse};

use crate::state::AppState;

/// POST /api/v1/reset/{prefix}
pub async fn reset_counter(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
    Json(req): Json<ResetRequest>,
) -> AppResult<Json<ApiResponse<ResetResponse>>> {
    let response = state.service.reset(&prefix, req).await?;
    Ok(Json(ApiResponse::success(response)))
}
