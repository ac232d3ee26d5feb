//! Error types for web handlers.
//!
//! [`AppError`] bridges the domain taxonomy and HTTP: every handler
//! returns `Result<_, AppError>`, and the `IntoResponse` impl renders the
//! status plus a `{ "message": ... }` body, the exact error contract the
//! frontend matches on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lectern_core::DomainError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for logging, not exposed to the client)
    code: &'static str,
    /// Internal error (for logging, not exposed to the client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach a source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED")
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into(), "FORBIDDEN")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message.into(), "NOT_FOUND")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// The HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON). The frontend surfaces `message` verbatim.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Map the domain taxonomy onto HTTP statuses.
///
/// Conflicts map to 400, not 409: the original API surfaced uniqueness
/// violations as plain bad requests and the frontend matches on the
/// message string, so the status is part of the compatibility contract.
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err {
            DomainError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, message, "VALIDATION"),
            DomainError::Authorization(_) => {
                Self::new(StatusCode::FORBIDDEN, message, "AUTHORIZATION")
            }
            DomainError::Ownership(_) => Self::new(StatusCode::FORBIDDEN, message, "OWNERSHIP"),
            DomainError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND"),
            DomainError::Conflict(_) => Self::new(StatusCode::BAD_REQUEST, message, "CONFLICT"),
            DomainError::InvalidState(_) => {
                Self::new(StatusCode::BAD_REQUEST, message, "INVALID_STATE")
            }
            DomainError::Capacity(_) => Self::new(StatusCode::BAD_REQUEST, message, "CAPACITY"),
            DomainError::Unexpected(_) => Self::internal("An internal error occurred")
                .with_source(anyhow::anyhow!(message)),
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn conflict_maps_to_400() {
        let err: AppError = DomainError::conflict("duplicate").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn ownership_maps_to_403() {
        let err: AppError = DomainError::ownership("not yours").into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn unexpected_hides_the_internal_message() {
        let err: AppError = DomainError::unexpected("connection refused").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "[INTERNAL_SERVER_ERROR] An internal error occurred");
    }
}
