//! Health Routes
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Does not touch the board: a probe must not queue behind a running query.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let source = state.dispatcher.source();
    let capabilities = source.capabilities();
    let idle = state.session.try_lock().is_ok();

    Json(HealthResponse {
        status: if idle { "healthy" } else { "busy" }.to_string(),
        source: source.name().to_string(),
        keyword_search: capabilities.keyword_search,
        author_search: capabilities.author_search,
        idle,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
