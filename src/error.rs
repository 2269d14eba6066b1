//! Unified API error handling
//!
//! Provides consistent error responses across all endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Requested status change is not in the lead state machine's adjacency.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Lost a broadcast-acceptance race to another recipient.
    #[error("Already claimed: {0}")]
    AlreadyClaimed(String),

    /// Broadcast recipient count outside the tenant's allowed range.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn already_claimed(msg: impl Into<String>) -> Self {
        Self::AlreadyClaimed(msg.into())
    }

    pub fn limit_exceeded(msg: impl Into<String>) -> Self {
        Self::LimitExceeded(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(msg.into()))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_) | Self::AlreadyClaimed(_) => StatusCode::CONFLICT,
            Self::LimitExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::AlreadyClaimed(_) => "ALREADY_CLAIMED",
            Self::LimitExceeded(_) => "LIMIT_EXCEEDED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::InvalidArgument(msg)
            | Self::NotFound(msg)
            | Self::InvalidTransition(msg)
            | Self::AlreadyClaimed(msg)
            | Self::LimitExceeded(msg) => msg.clone(),
            // Don't leak internal error details
            Self::Internal(_) | Self::Database(_) => "An internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log internal errors
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "Internal server error");
            }
            Self::Database(e) => {
                tracing::error!(error = ?e, "Database error");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            request_id: None,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_loss_and_bad_transition_map_to_distinct_codes() {
        let claimed = ApiError::already_claimed("lead already accepted");
        let invalid = ApiError::invalid_transition("cannot move from won to pending");
        assert_eq!(claimed.error_code(), "ALREADY_CLAIMED");
        assert_eq!(invalid.error_code(), "INVALID_TRANSITION");
        assert_eq!(claimed.status_code(), StatusCode::CONFLICT);
        assert_eq!(invalid.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ApiError::internal("connection refused to 10.0.0.3:5432");
        assert_eq!(err.public_message(), "An internal error occurred");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn limit_exceeded_is_unprocessable() {
        let err = ApiError::limit_exceeded("broadcast allows at most 5 recipients");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), "LIMIT_EXCEEDED");
    }
}
