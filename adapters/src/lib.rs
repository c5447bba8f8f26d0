//! Thin adapters over the retrieval core: an OpenAI-compatible chat proxy,
//! a `/retrieve` + `/create` REST surface, a context-provider variant for
//! editor integrations, and an MCP server exposing per-collection search
//! tools.
//!
//! `spec.md` §1 calls these adapters "thin... over the core" and places
//! them outside the four core subsystems; this crate exists so that
//! contract can actually be satisfied by something, per `spec.md` §6.
//!
//! Grounded on `original_source/tiny_chat/api/{compat_openai,rest,
//! continue_context_provider}.py` and `original_source/tiny_chat/mcp/
//! search_mcp.py`. Every handler bridges into the synchronous core
//! (`ragcore-store`, `ragcore-strategy`) directly; `axum`'s multi-threaded
//! runtime tolerates the resulting blocking calls the same way
//! `spec.md` §5 expects a worker thread to block on the store/embedding
//! suspension points.

pub mod context_provider;
pub mod error;
pub mod mcp;
pub mod openai_compat;
pub mod rest;
pub mod retrieve;
pub mod state;

pub use error::AdapterError;
pub use mcp::RagMcpServer;
pub use retrieve::RetrievedChunk;
pub use state::AppState;

use axum::Router;

/// Merges every HTTP surface (`/v1/chat/completions`, `/v1/models`,
/// `/retrieve`, `/create`) into one router, for the combined HTTP-service
/// binary. The context-provider `/retrieve` variant is intentionally not
/// merged here — it shares a route path with [`rest::router`]'s own
/// `/retrieve` and is served on its own port/mount by callers that need it
/// (see `ragcore-cli`'s `serve` binary).
#[must_use]
pub fn http_router(state: AppState) -> Router {
    Router::new()
        .merge(openai_compat::router(state.clone()))
        .merge(rest::router(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_store::config::{StoreConfig, MEMORY_PATH};
    use ragcore_store::VectorStoreManager;
    use ragcore_strategy::RagStrategyFactory;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let manager = Arc::new(
            VectorStoreManager::new(StoreConfig {
                file_path: Some(MEMORY_PATH.to_string()),
                server_url: None,
                api_key: None,
                selected_collection_name: None,
            })
            .unwrap(),
        );
        let factory = Arc::new(RagStrategyFactory::new("/nonexistent/models"));
        AppState::new(manager, factory, None)
    }

    #[test]
    fn visible_collections_is_empty_on_a_fresh_store() {
        let state = test_state();
        assert!(state.visible_collections(false).unwrap().is_empty());
    }

    #[tokio::test]
    async fn retrieve_against_unknown_collection_is_not_found() {
        let state = test_state();
        let err = state.retrieve("ghost", "query", None, None).unwrap_err();
        assert!(matches!(err, AdapterError::CollectionNotFound(_)));
    }
}
