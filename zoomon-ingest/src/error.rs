//! Error types for zoomon-ingest
//!
//! Two layers: `ImportError` is the fatal run-level taxonomy of the import
//! pipeline (nothing was processed), `ApiError` is the HTTP boundary.
//! Per-record failures are not errors at all; they travel inside the
//! import report as data.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Fatal run-level import errors
///
/// Any of these aborts the run before a single record is processed. They
/// never appear inside a report; the caller gets them as a plain error.
#[derive(Debug, Error)]
pub enum ImportError {
    /// No input bytes were supplied
    #[error("No input file supplied")]
    MissingInput,

    /// The bytes could not be parsed as a spreadsheet
    #[error("Could not parse spreadsheet: {0}")]
    Format(String),

    /// The data sheet has no rows after the header
    #[error("Sheet '{0}' contains no data rows")]
    EmptyInput(String),

    /// Database error during cache load or vivification
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Report file I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization error
    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),

    /// Dimension vivification error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// True for input-shaped errors the caller can fix (HTTP 400),
    /// false for infrastructure errors (HTTP 500)
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ImportError::MissingInput | ImportError::Format(_) | ImportError::EmptyInput(_)
        )
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Import pipeline error (400 for input errors, 500 otherwise)
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// zoomon-common error
    #[error("Common error: {0}")]
    Common(#[from] zoomon_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Import(ref err) if err.is_input_error() => {
                (StatusCode::BAD_REQUEST, "IMPORT_ERROR", err.to_string())
            }
            ApiError::Import(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IMPORT_ERROR",
                err.to_string(),
            ),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
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

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
