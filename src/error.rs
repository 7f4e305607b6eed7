//! Error types for the runbridge daemon.
//!
//! Every failure that crosses the HTTP boundary maps onto one of these
//! variants; handlers return `Result<Json<T>, Error>` and the `IntoResponse`
//! impl renders the uniform `{"status": "error", "message": ...}` body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Result type for daemon operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Daemon errors with HTTP status code mappings.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Bearer token missing or mismatched.
    #[error("unauthorized: {0}")]
    Auth(String),

    /// Configuration, log source, or project scope not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request parameter.
    #[error("invalid request: {0}")]
    Validation(String),

    /// No project scope is available to serve the request.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Uniform error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Auth(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Unavailable(msg)
            | Self::Internal(msg) => msg.clone(),
        };

        (
            self.status_code(),
            Json(ErrorBody {
                status: "error",
                message,
            }),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
