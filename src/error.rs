//! Error types for tagshelf
//!
//! Defines the crate error type using thiserror for clear error propagation.
//! Enrichment-stage failures (directory header fetches, catalog sub-fetches)
//! are absorbed at the call site and reported as reduced completeness; only
//! mutating operations propagate as request-level failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main error type for tagshelf
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource does not exist (tag, catalog entry, box)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed client input (bad uid, path traversal, duplicate model)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The hub or another remote collaborator failed or is unreachable
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Atomic write of a catalog or tag-state file could not complete.
    /// Represents lost user intent; never auto-retried.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the tagshelf Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status for this error when it escapes a handler
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::WriteFailure(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Expected client mistakes are not server errors; keep them quiet.
        match &self {
            Error::InvalidInput(msg) => tracing::debug!("rejected request: {}", msg),
            Error::NotFound(msg) => tracing::debug!("not found: {}", msg),
            other => tracing::error!("request failed: {}", other),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("JSON error: {}", e))
    }
}
