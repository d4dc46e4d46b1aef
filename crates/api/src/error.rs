//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, StoreError};

/// API-level error type that maps to HTTP responses.
///
/// Every error renders as `{"message": ..., "code": ...}` with a stable
/// machine-readable code.
#[derive(Debug)]
pub enum ApiError {
    /// No usable identity on the request, or the subject is unmapped.
    Unauthorized {
        message: &'static str,
        code: &'static str,
    },
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    /// The request carried no identity headers.
    pub fn no_identity() -> Self {
        ApiError::Unauthorized {
            message: "no valid identity found on the request",
            code: "auth/no-identity",
        }
    }

    /// The identity subject is not mapped to a user.
    pub fn unknown_subject() -> Self {
        ApiError::Unauthorized {
            message: "identity subject is not mapped to a user",
            code: "auth/user-not-found",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::Unauthorized { message, code } => {
                (StatusCode::UNAUTHORIZED, message.to_string(), code)
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, "request/invalid"),
            ApiError::Domain(err) => {
                let code = err.code();
                (domain_status(&err), err.to_string(), code)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message, "storage/failure")
            }
        };

        let body = serde_json::json!({ "message": message, "code": code });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InsufficientStock { .. }
        | DomainError::EmptyCart
        | DomainError::RiderRequired
        | DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Store(StoreError::RevisionConflict { .. }) => StatusCode::CONFLICT,
        DomainError::Store(StoreError::OrderNotFound(_)) => StatusCode::NOT_FOUND,
        DomainError::Store(err) => {
            tracing::error!(error = %err, "store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
