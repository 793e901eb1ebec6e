//! REST adapter over the core operations
//!
//! Thin handlers only: extract, call the service, wrap in the
//! [`shared::error::ApiResponse`] envelope. Everything interesting
//! lives in the service layer.

pub mod audit;
pub mod config;
pub mod health;
pub mod issue;
pub mod reset;
pub mod status;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/next/{prefix}", get(issue::next_id))
        .route("/batch/{prefix}", post(issue::next_batch))
        .route("/status/{prefix}", get(status::counter_status))
        .route("/reset/{prefix}", post(reset::reset_counter))
        .route(
            "/config/{prefix}",
            get(config::get_config).post(config::update_config),
        )
        .route("/audit/{prefix}", get(audit::audit_trail));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", v1)
        .with_state(state)
}
