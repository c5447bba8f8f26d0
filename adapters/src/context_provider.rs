//! Context-provider `/retrieve` variant, for editor integrations.
//!
//! Grounded on `original_source/tiny_chat/api/continue_context_provider.py`:
//! same retrieval call as [`crate::rest`], but the response shape is
//! `{name, description, content}` triples (the shape a "Continue"-style
//! editor context provider expects) rather than `{source, content, page}`.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::state::AppState;

/// Builds the context-provider `/retrieve` router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new().route("/retrieve", post(retrieve)).with_state(state)
}

/// Request body, identical in shape to [`crate::rest::RetrieveRequest`].
#[derive(Clone, Debug, Deserialize)]
pub struct ContextRetrieveRequest {
    /// Natural-language query.
    pub query: String,
    /// Collection to search.
    pub collection_name: String,
}

/// One `{name, description, content}` triple an editor context provider
/// consumes.
#[derive(Clone, Debug, Serialize)]
pub struct ContextItem {
    /// `"{source} (page {page})"`, a human-readable item label.
    pub name: String,
    /// Short description; reuses the chunk's source for now.
    pub description: String,
    /// Chunk text.
    pub content: String,
}

async fn retrieve(
    State(state): State<AppState>,
    Json(request): Json<ContextRetrieveRequest>,
) -> Result<Json<Vec<ContextItem>>, AdapterError> {
    if request.query.is_empty() {
        return Err(AdapterError::BadRequest("query must not be empty".to_string()));
    }
    let hits = state.retrieve(&request.collection_name, &request.query, None, None)?;
    Ok(Json(
        hits.into_iter()
            .map(|h| ContextItem {
                name: format!("{} (page {})", h.source, h.page),
                description: h.source.clone(),
                content: h.content,
            })
            .collect(),
    ))
}
