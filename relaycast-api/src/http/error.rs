// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert relaycast_core errors to HTTP errors
impl From<relaycast_core::Error> for AppError {
    fn from(err: relaycast_core::Error) -> Self {
        use relaycast_core::Error;

        match err {
            Error::Validation(e) => AppError::bad_request(e.to_string()),
            Error::NotFound(msg) => AppError::not_found(msg),
            Error::Conflict(msg) => AppError::conflict(msg),
            Error::IntegrityMismatch { declared, computed } => AppError::unprocessable(format!(
                "Digest mismatch: declared {declared}, computed {computed}"
            )),
            Error::Aborted => AppError::bad_request("Upload aborted"),
            Error::Storage { context, source } => {
                tracing::error!("Storage error: {context}: {source}");
                AppError::internal_server_error("Storage error")
            }
            Error::Database(e) => {
                tracing::error!("Database error: {e}");
                AppError::internal_server_error("Database error")
            }
            Error::Serialization(e) => {
                tracing::error!("Serialization error: {e}");
                AppError::internal_server_error("Data processing error")
            }
            Error::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                AppError::internal_server_error("Internal server error")
            }
        }
    }
}

/// Convert multipart parse errors to HTTP errors
impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::bad_request(format!("Multipart error: {err}"))
    }
}
