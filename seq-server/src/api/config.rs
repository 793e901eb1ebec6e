//! Prefix configuration endpoints

use axum::extract::{Path, State};
use axum::Json;
use shared::error::{ApiResponse, AppResult};
use shared::models::{ConfigUpdateRequest, PrefixConfig};

use crate::state::AppState;

/// GET /api/v1/config/{prefix}
pub async fn get_config(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> AppResult<Json<ApiResponse<PrefixConfig>>> {
    let config = state.service.get_config(&prefix).await?;
    Ok(Json(ApiResponse::success(config)))
}

/// POST /api/v1/config/{prefix}
pub async fn update_config(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
    Json(req): Json<ConfigUpdateRequest>,
) -> AppResult<Json<ApiResponse<PrefixConfig>>> {
    let config = state.service.update_config(&prefix, req).await?;
    Ok(Json(ApiResponse::success(config)))
}
