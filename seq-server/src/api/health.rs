//! Health check endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.service.health().await;
    let status = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "status": if health.healthy { "ok" } else { "degraded" },
            "service": "seq-server",
            "version": env!("CARGO_PKG_VERSION"),
            "components": health.components,
            "timestamp": health.timestamp,
        })),
    )
}
