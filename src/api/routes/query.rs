//! Query Routes
//!
//! - POST /api/v1/query - Run one task description and return its entries

use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Duration;

use crate::api::dto::QueryResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::tasks::TaskSpec;

/// POST /api/v1/query
///
/// The body uses the task file format; `output` is ignored.
///
/// A query that outlives `request_timeout_secs` is dropped where it stands,
/// possibly halfway through a bracket. Nothing fetched so far is returned;
/// the dense fetcher's progress lines are the only record of how far it got.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(task): Json<TaskSpec>,
) -> ApiResult<Json<QueryResponse>> {
    // Reject bad parameters before queueing for the session
    let query = task.to_query()?;

    let session = state.session.lock().await;
    let limit = Duration::from_secs(state.config.request_timeout_secs);

    tracing::info!("API query: {}", query);
    let outcome = match tokio::time::timeout(limit, state.dispatcher.run(&session, &query)).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(
                "Abandoned query [{}] after {}s; partial results discarded",
                query,
                limit.as_secs()
            );
            return Err(ApiError::Timeout(limit.as_secs()));
        }
    };

    Ok(Json(QueryResponse::from(outcome)))
}
