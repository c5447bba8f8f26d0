//! `/retrieve` + `/create` REST surface.
//!
//! Grounded on `original_source/tiny_chat/api/rest.py`: a minimal retrieval
//! and single-chunk-creation surface, independent of the OpenAI-compat
//! proxy and MCP surfaces (`spec.md` §6).

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ragcore_core::model::Metadata;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::retrieve::RetrievedChunk;
use crate::state::AppState;

/// Builds the `/retrieve` + `/create` router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/retrieve", post(retrieve))
        .route("/create", post(create))
        .with_state(state)
}

/// `POST /retrieve` request body.
#[derive(Clone, Debug, Deserialize)]
pub struct RetrieveRequest {
    /// Natural-language query.
    pub query: String,
    /// Collection to search.
    pub collection_name: String,
}

async fn retrieve(
    State(state): State<AppState>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<Vec<RetrievedChunk>>, AdapterError> {
    if request.query.is_empty() {
        return Err(AdapterError::BadRequest("query must not be empty".to_string()));
    }
    let hits = state.retrieve(&request.collection_name, &request.query, None, None)?;
    Ok(Json(hits))
}

/// `POST /create` request body.
#[derive(Clone, Debug, Deserialize)]
pub struct CreateRequest {
    /// Collection to index into.
    pub collection_name: String,
    /// Source identifier for the new chunk's parent document.
    pub source: String,
    /// Raw text to chunk and index.
    pub text: String,
    /// 1-based page ordinal; defaults to 1.
    pub page: Option<usize>,
}

/// `POST /create` response body.
#[derive(Clone, Debug, Serialize)]
pub struct CreateResponse {
    /// Whether the chunk(s) were indexed.
    pub create: bool,
}

async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<CreateResponse>, AdapterError> {
    if request.text.is_empty() {
        return Err(AdapterError::BadRequest("text must not be empty".to_string()));
    }
    let entry = state.require_collection(&request.collection_name)?;
    let strategy = state
        .strategy_factory
        .get_strategy(&entry.rag_strategy, entry.use_gpu)?;

    let mut meta: Metadata = Metadata::new();
    meta.insert("source".to_string(), request.source.clone());
    meta.insert("page".to_string(), request.page.unwrap_or(1).to_string());

    state.manager.add_documents(
        &[request.text],
        &[meta],
        &request.collection_name,
        &strategy,
        entry.chunk_size,
        entry.chunk_overlap,
    )?;

    Ok(Json(CreateResponse { create: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_store::config::{StoreConfig, MEMORY_PATH};
    use ragcore_store::{Collection, VectorStoreManager};
    use ragcore_strategy::RagStrategyFactory;
    use std::sync::Arc;

    fn state_with_collection(name: &str) -> AppState {
        let manager = Arc::new(
            VectorStoreManager::new(StoreConfig {
                file_path: Some(MEMORY_PATH.to_string()),
                server_url: None,
                api_key: None,
                selected_collection_name: None,
            })
            .unwrap(),
        );
        manager
            .ensure_collection(name, &ragcore_strategy::RetrievalStrategy::Noop)
            .unwrap();
        Collection {
            name: name.to_string(),
            description: "test".to_string(),
            chunk_size: 500,
            chunk_overlap: 0,
            top_k: 5,
            score_threshold: ragcore_core::NO_THRESHOLD,
            rag_strategy: "noop".to_string(),
            use_gpu: false,
            show_in_mcp: true,
        }
        .save(&manager)
        .unwrap();
        AppState::new(manager, Arc::new(RagStrategyFactory::new("/nonexistent/models")), None)
    }

    #[tokio::test]
    async fn create_then_retrieve_round_trips_through_the_handlers() {
        let state = state_with_collection("docs");
        create(
            State(state.clone()),
            Json(CreateRequest {
                collection_name: "docs".to_string(),
                source: "a.txt".to_string(),
                text: "hello world".to_string(),
                page: None,
            }),
        )
        .await
        .unwrap();

        let Json(hits) = retrieve(
            State(state),
            Json(RetrieveRequest {
                query: "hello".to_string(),
                collection_name: "docs".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "a.txt");
    }

    #[tokio::test]
    async fn retrieve_rejects_empty_query() {
        let state = state_with_collection("docs");
        let err = retrieve(
            State(state),
            Json(RetrieveRequest {
                query: String::new(),
                collection_name: "docs".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AdapterError::BadRequest(_)));
    }
}
