//! Data Transfer Objects
//!
//! Response types for the API endpoints. Query requests reuse
//! [`TaskSpec`](crate::tasks::TaskSpec), so a task file entry can be posted
//! as is.

use crate::model::{Entry, IndexBracket};
use crate::query::{QueryOutcome, Route};
use serde::Serialize;

/// Query response
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub entries: Vec<Entry>,
    pub count: usize,
    pub route: Route,
    /// Index bracket used for a time window, when one was located
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bracket: Option<IndexBracket>,
    /// Server-side search applied, as `keyword=...` or `author=...`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pushed_filter: Option<String>,
    pub execution_time_ms: u64,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        Self {
            count: outcome.entries.len(),
            route: outcome.route,
            bracket: outcome.bracket,
            pushed_filter: outcome.pushed_filter.as_ref().map(ToString::to_string),
            execution_time_ms: outcome.execution_time_ms,
            entries: outcome.entries,
        }
    }
}

/// Full health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Name of the configured source
    pub source: String,
    pub keyword_search: bool,
    pub author_search: bool,
    /// Whether the session is free right now
    pub idle: bool,
    pub uptime_seconds: u64,
    pub version: String,
}
