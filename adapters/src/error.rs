//! Adapter-facing error type and its HTTP/MCP renderings.
//!
//! Grounded on `ragcore_core::error::CoreError`'s five behavioral kinds;
//! adapters never leak a stack trace, only a human-readable string naming
//! the failing collection/source and a short cause phrase (`spec.md` §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ragcore_core::error::CoreError;
use thiserror::Error;

/// Errors surfaced across every adapter surface in this crate.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The request body or query was malformed (`spec.md` §7 `InputRejected`).
    #[error("{0}")]
    BadRequest(String),

    /// The named collection is not visible (not found, or `show_in_mcp = false`
    /// for the MCP surface specifically).
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The retrieval core itself failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::CollectionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Core(CoreError::InputRejected(_)) => StatusCode::BAD_REQUEST,
            Self::Core(CoreError::Invariant(_)) => StatusCode::NOT_FOUND,
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
