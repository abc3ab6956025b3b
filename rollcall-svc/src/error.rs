//! HTTP error mapping for rollcall-svc
//!
//! Every failure leaves the service as `{"error": {"code", "message"}}`
//! with a status chosen by cause.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::delegate::DelegateError;
use crate::services::{EnrollmentError, ReconcileError, SummaryError};
use crate::store::StoreError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Duplicate enrollment or similar (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Delegate failed or answered unusably (502)
    #[error("Delegate unavailable: {0}")]
    DelegateUnavailable(String),

    /// Delegate did not answer in time (504)
    #[error("Delegate timed out: {0}")]
    DelegateTimedOut(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Common error: {0}")]
    Common(#[from] rollcall_common::Error),
}

impl ApiError {
    /// Whether the failure is worth surfacing on `/health`
    pub fn is_server_side(&self) -> bool {
        match self {
            ApiError::NotFound(_) | ApiError::BadRequest(_) | ApiError::Conflict(_) => false,
            ApiError::Common(err) => !err.is_client_error(),
            _ => true,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::DelegateUnavailable(msg) => {
                (StatusCode::BAD_GATEWAY, "DELEGATE_UNAVAILABLE", msg)
            }
            ApiError::DelegateTimedOut(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "DELEGATE_TIMEOUT", msg)
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => match err {
                rollcall_common::Error::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                rollcall_common::Error::InvalidDate(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_DATE", err.to_string())
                }
                rollcall_common::Error::InvalidImage(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_IMAGE", err.to_string())
                }
                rollcall_common::Error::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    err.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ClassNotFound(_) | StoreError::StudentNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            StoreError::DuplicateRollNumber(_) | StoreError::DuplicateClassCode(_) => {
                ApiError::Conflict(err.to_string())
            }
            StoreError::WriteRejected(msg) => ApiError::Internal(msg),
            StoreError::Common(e) => ApiError::Common(e),
        }
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::InvalidInput(msg) => ApiError::BadRequest(msg),
            EnrollmentError::ClassNotFound(_) | EnrollmentError::StudentNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            EnrollmentError::DuplicateRollNumber(_) => ApiError::Conflict(err.to_string()),
            EnrollmentError::CodeSpaceExhausted(_) => ApiError::Internal(err.to_string()),
            EnrollmentError::Store(e) => e.into(),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::InvalidDate(msg) => ApiError::BadRequest(msg),
            ReconcileError::DelegateUnavailable(_) => ApiError::DelegateUnavailable(err.to_string()),
            ReconcileError::DelegateTimedOut(_) => ApiError::DelegateTimedOut(err.to_string()),
        }
    }
}

impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::InvalidRange(msg) => ApiError::BadRequest(msg),
            SummaryError::DelegateUnavailable(_) | SummaryError::Malformed(_) => {
                ApiError::DelegateUnavailable(err.to_string())
            }
            SummaryError::DelegateTimedOut(_) => ApiError::DelegateTimedOut(err.to_string()),
        }
    }
}

impl From<DelegateError> for ApiError {
    fn from(err: DelegateError) -> Self {
        match err {
            DelegateError::TimedOut => ApiError::DelegateTimedOut(err.to_string()),
            DelegateError::Unavailable(_) | DelegateError::Malformed(_) => {
                ApiError::DelegateUnavailable(err.to_string())
            }
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                StoreError::DuplicateRollNumber("7".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                ReconcileError::DelegateTimedOut(Duration::from_secs(20)).into(),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ReconcileError::DelegateUnavailable("down".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                SummaryError::Malformed("no summary".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                rollcall_common::Error::InvalidImage("empty".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_client_errors_are_not_server_side() {
        assert!(!ApiError::Conflict("dup".into()).is_server_side());
        assert!(!ApiError::Common(rollcall_common::Error::InvalidDate("x".into())).is_server_side());
        assert!(ApiError::DelegateUnavailable("down".into()).is_server_side());
    }
}
