//! Unified error types for the catalog server
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the catalog server
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced item/tag/image does not exist (or has the wrong parent)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique name constraint violated on item or tag
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upload declared a content type outside the accepted set
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Uploaded bytes could not be decoded as an image
    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    /// Media store write failures (disk full, permissions)
    #[error("Storage write error: {0}")]
    StorageWrite(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            AppError::DuplicateName(_) => {
                (StatusCode::BAD_REQUEST, "DuplicateName", self.to_string())
            }
            AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            AppError::UnsupportedMediaType(_) => (
                StatusCode::BAD_REQUEST,
                "UnsupportedMediaType",
                self.to_string(),
            ),
            AppError::InvalidImage(_) => {
                (StatusCode::BAD_REQUEST, "InvalidImageData", self.to_string())
            }
            AppError::StorageWrite(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "StorageWriteError",
                "Failed to persist uploaded file".to_string(),
            ),
            AppError::Database(_) | AppError::Io(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for catalog operations
pub type AppResult<T> = Result<T, AppError>;

/// Whether a sqlx error is a UNIQUE constraint violation.
///
/// Used at the persistence boundary to turn name collisions into
/// `DuplicateName` after the enclosing transaction rolls back.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
