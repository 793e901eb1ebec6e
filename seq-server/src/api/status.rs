//! Counter status endpoint

use axum::extract::{Path, State};
use axum::Json;
use shared::error::{ApiResponse, AppResult};
use shared::models::CounterStatus;

use crate::state::AppState;

/// GET /api/v1/status/{prefix}
pub async fn counter_status(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> AppResult<Json<ApiResponse<CounterStatus>>> {
    let status = state.service.status(&prefix).await?;
    Ok(Json(ApiResponse::success(status)))
}
