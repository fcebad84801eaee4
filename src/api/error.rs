//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use crate::query::QueryError;
use crate::source::SourceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Query building or execution error
    #[error("{0}")]
    Query(#[from] QueryError),

    /// The query did not finish within the request timeout
    #[error("Query timed out after {0}s")]
    Timeout(u64),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Query(QueryError::Source(e)) => match e {
                SourceError::NoSuchBoard(_) => (StatusCode::NOT_FOUND, "BOARD_NOT_FOUND"),
                SourceError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
                SourceError::AuthFailed(_) | SourceError::NotAuthenticated => {
                    (StatusCode::BAD_GATEWAY, "SOURCE_AUTH_FAILED")
                }
                e if e.is_transient() => (StatusCode::SERVICE_UNAVAILABLE, "SOURCE_UNAVAILABLE"),
                _ => (StatusCode::BAD_GATEWAY, "SOURCE_ERROR"),
            },
            ApiError::Query(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::Query(QueryError::Configuration("missing board".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Query(QueryError::InvalidTime("25:00".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Query(SourceError::NoSuchBoard("Nope".into()).into()),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Query(SourceError::Transient("503".into()).into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Query(SourceError::NotAuthenticated.into()),
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::Timeout(600), StatusCode::GATEWAY_TIMEOUT),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
