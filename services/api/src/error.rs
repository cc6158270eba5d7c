//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and its
//! mapping onto HTTP responses. Clients receive a stable classification
//! string rather than internal messages, sufficient to tell "try again"
//! (generation) from "this request is invalid" (lifecycle violations) from
//! "data integrity problem" (decryption).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;
use mystery_core::ports::MysteryError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An error that propagated up from the core services.
    #[error("Core error: {0}")]
    Core(#[from] MysteryError),

    /// An error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// A standard Input/Output error (e.g. binding the listen socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// The stable error classification exposed to clients.
    fn classification(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Core(core) => match core {
                MysteryError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                MysteryError::AlreadyCompleted => (StatusCode::CONFLICT, "already_completed"),
                MysteryError::InvalidAttempt(_) => (StatusCode::CONFLICT, "invalid_attempt"),
                MysteryError::Generation(_) | MysteryError::Validation { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "generation_failed")
                }
                MysteryError::Decryption(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "data_integrity")
                }
                MysteryError::Conflict(_) | MysteryError::Store(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "storage")
                }
            },
            ApiError::Config(_) | ApiError::Database(_) | ApiError::Io(_)
            | ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.classification();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": kind }))).into_response()
    }
}
