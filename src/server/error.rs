//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become an `{ "error": ... }`
//! JSON body with a matching status code.
//!
//! Internal errors are logged in full but only a generic message reaches the
//! caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::GenRelayError;

/// Message shown when uploads arrive but no blob store can take them.
pub const STORAGE_NOT_CONFIGURED: &str = "File upload storage is not configured: enable blob \
     storage (BLOB_READ_WRITE_TOKEN or GENRELAY_UPLOAD_DIR) or pass the images as imageUrls instead.";

/// All errors that can occur while handling a generation request.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or incomplete request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Uploaded files could not be persisted.
    #[error("storage not configured: {0}")]
    StorageNotConfigured(String),

    /// The provider rejected the request; status and body are relayed as-is.
    #[error("provider error: {status}")]
    Provider {
        /// Status the provider answered with.
        status: u16,
        /// Error payload to send back.
        body: serde_json::Value,
    },

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!(m)),
            ServerError::StorageNotConfigured(detail) => {
                warn!(detail = %detail, "upload rejected, blob storage unavailable");
                (StatusCode::NOT_IMPLEMENTED, json!(STORAGE_NOT_CONFIGURED))
            }
            ServerError::Provider { status, body } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            ),
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, json!("Internal error"))
            }
        };
        (status, Json(json!({ "error": body }))).into_response()
    }
}

impl From<GenRelayError> for ServerError {
    fn from(e: GenRelayError) -> Self {
        match e {
            GenRelayError::InvalidRequest(m) => ServerError::BadRequest(m),
            GenRelayError::StorageNotConfigured(m) => ServerError::StorageNotConfigured(m),
            GenRelayError::Provider { status, body } => ServerError::Provider { status, body },
            other => ServerError::Internal(other.to_string()),
        }
    }
}
