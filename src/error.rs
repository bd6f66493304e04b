//! Domain error types for the predict server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.
//! Every variant renders as `{"detail": "..."}` with the status code chosen in
//! [`AppError::status_code`].

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Upload exceeds the configured ceiling
    #[error("File size exceeds {}MB limit", *.0 as f64 / 1024.0 / 1024.0)]
    PayloadTooLarge(usize),

    /// Upload body has no bytes
    #[error("Empty file")]
    EmptyPayload,

    /// CSV parsed to a header without data rows
    #[error("CSV is empty")]
    EmptyTable,

    /// A required column is absent (case-insensitive match)
    #[error("Missing required column: {column}. Found: [{}]", .found.join(", "))]
    MissingColumn { column: String, found: Vec<String> },

    /// A cell in a required column cannot be used
    #[error("Invalid value in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },

    /// Malformed request (multipart, CSV syntax, missing field)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model prediction failed
    #[error("Model prediction failed: {0}")]
    ModelInference(String),

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Optional backing service is not configured or unreachable
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Filesystem operation failed
    #[error("File system error: {0}")]
    FileSystem(String),

    /// Anything else
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::PayloadTooLarge(_)
            | AppError::EmptyPayload
            | AppError::EmptyTable
            | AppError::MissingColumn { .. }
            | AppError::InvalidValue { .. }
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ModelInference(_)
            | AppError::Database(_)
            | AppError::FileSystem(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = match self {
            AppError::Database(_) | AppError::FileSystem(_) | AppError::Internal(_) => {
                tracing::error!("Unexpected error: {}", self);
                format!("Internal error: {}", self)
            }
            AppError::ModelInference(_) => {
                tracing::error!("{}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse { detail })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::InvalidInput(format!("CSV parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileSystem(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}
