//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.
//!
//! The rendered message is coarse for token and session
//! failures; the precise cause only reaches the log.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::kv::StoreError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

const TOKEN_REJECTED: &str = "Invalid or missing access token";
const NOT_AUTHENTICATED: &str = "Not authenticated";

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed request input
    #[error("{0}")]
    Validation(String),

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// User name or email already registered
    #[error("{0}")]
    Conflict(String),

    /// Invalid credentials (wrong password)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No bearer token in header or cookie
    #[error("Access token missing")]
    MissingToken,

    /// Token signature or format rejected
    #[error("Access token invalid")]
    InvalidToken,

    /// Token signature valid but `exp` has passed
    #[error("Access token expired")]
    ExpiredToken,

    /// No live session for the presented session id
    #[error("Session not found or expired")]
    Unauthenticated,

    /// Session store unreachable
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Malformed, mistyped or unlabelled JSON bodies share the `{message}` shape
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken => {
                StatusCode::FORBIDDEN
            }
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => ErrorKind::Unauthorized,
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken => {
                ErrorKind::Forbidden
            }
            AuthError::StoreUnavailable(_) => ErrorKind::ServiceUnavailable,
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Whether this is one of the bearer token failures
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::ExpiredToken
        )
    }

    /// Message safe to show to the caller
    fn public_message(&self) -> String {
        match self {
            AuthError::Validation(msg) | AuthError::Conflict(msg) => msg.clone(),
            AuthError::UserNotFound => "User not found".to_string(),
            AuthError::InvalidCredentials => "Invalid username or password".to_string(),
            _ if self.is_token_error() => TOKEN_REJECTED.to_string(),
            AuthError::Unauthenticated => NOT_AUTHENTICATED.to_string(),
            AuthError::StoreUnavailable(_) => {
                "Session service temporarily unavailable".to_string()
            }
            _ => "Internal server error".to_string(),
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.public_message())
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::StoreUnavailable(e) => {
                tracing::error!(error = %e, "Session store unavailable");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::InvalidToken | AuthError::ExpiredToken => {
                tracing::info!(error = %self, "Access token rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::MissingToken.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::ExpiredToken.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::StoreUnavailable(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_status_code_agrees_with_kind() {
        let errors = [
            AuthError::Validation("x".into()),
            AuthError::UserNotFound,
            AuthError::Conflict("x".into()),
            AuthError::InvalidCredentials,
            AuthError::MissingToken,
            AuthError::InvalidToken,
            AuthError::ExpiredToken,
            AuthError::Unauthenticated,
            AuthError::StoreUnavailable(StoreError::Command("x".into())),
            AuthError::Internal("x".into()),
        ];

        for err in errors {
            assert_eq!(err.status_code().as_u16(), err.kind().status_code());
        }
    }

    #[test]
    fn test_token_causes_render_identically() {
        let messages: Vec<String> = [
            AuthError::MissingToken,
            AuthError::InvalidToken,
            AuthError::ExpiredToken,
        ]
        .iter()
        .map(|e| e.to_app_error().message().to_string())
        .collect();

        assert!(messages.iter().all(|m| m == TOKEN_REJECTED));
    }

    #[test]
    fn test_internal_detail_not_rendered() {
        let err = AuthError::Internal("pool exhausted at 10.0.0.3".into());
        assert!(!err.to_app_error().message().contains("10.0.0.3"));
    }
}
