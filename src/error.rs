// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// `RateLimited` is a backoff condition, not a failure: stage handlers catch
/// it at the stage boundary, record `Yellow` bookkeeping status, and let the
/// queue's own retry policy re-deliver the task.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Cache conflict: {0}")]
    CacheConflict(String),

    #[error("Task dispatch error: {0}")]
    Dispatch(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when a retry of the same task may succeed (timeouts, transient
    /// upstream failures). Extraction and conflict errors are not retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Fetch(_) | AppError::RateLimited | AppError::Database(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Fetch(msg) => (StatusCode::BAD_GATEWAY, "fetch_error", Some(msg.clone())),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", None),
            AppError::Extraction(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "extraction_error",
                Some(msg.clone()),
            ),
            AppError::CacheConflict(msg) => {
                (StatusCode::CONFLICT, "cache_conflict", Some(msg.clone()))
            }
            AppError::Dispatch(msg) => {
                tracing::error!(error = %msg, "Task dispatch error");
                (StatusCode::INTERNAL_SERVER_ERROR, "dispatch_error", None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
