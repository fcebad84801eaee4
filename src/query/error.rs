//! Query error types
//!
//! Per-index fetch failures never show up here: the pipeline stages absorb
//! them. Only bad query parameters and failures that leave nothing to fetch
//! reach the caller.

use crate::source::SourceError;
use thiserror::Error;

/// Errors that can occur while building or running a query
#[derive(Error, Debug)]
pub enum QueryError {
    /// Bad or missing query parameters, reported before any fetch
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A time-of-day bound that is not `HH:MM`
    #[error("Invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),

    /// A calendar bound that could not be parsed
    #[error("Invalid date {0:?}, expected YYYY-MM-DD, today, yesterday or now-<N>d")]
    InvalidDate(String),

    /// The source failed on a call the query cannot do without
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

impl QueryError {
    /// Whether the query was rejected before touching the source
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Source(_))
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
