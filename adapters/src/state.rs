//! Shared state every adapter surface in this crate is built against.
//!
//! One [`AppState`] is constructed once per process and cloned cheaply
//! (everything inside is `Arc`-wrapped) into each `axum` handler and the
//! MCP server.

use std::sync::Arc;

use ragcore_core::chat::ChatModel;
use ragcore_store::VectorStoreManager;
use ragcore_strategy::RagStrategyFactory;

use crate::error::AdapterError;
use crate::retrieve::RetrievedChunk;

/// Shared handle to the retrieval core, plus the optional upstream chat
/// model the OpenAI-compatible proxy forwards to after augmenting the
/// transcript with retrieved context.
#[derive(Clone)]
pub struct AppState {
    /// Owns the store connection; shared across every adapter surface.
    pub manager: Arc<VectorStoreManager>,
    /// Builds/caches the embedding backends a collection's strategy needs.
    pub strategy_factory: Arc<RagStrategyFactory>,
    /// The actual LLM this process proxies chat completions to. `None`
    /// disables `/v1/chat/completions` (the REST/MCP retrieval surfaces
    /// still work without it).
    pub chat: Option<Arc<dyn ChatModel>>,
}

impl AppState {
    /// Builds adapter state over an already-constructed manager and
    /// strategy factory.
    #[must_use]
    pub fn new(
        manager: Arc<VectorStoreManager>,
        strategy_factory: Arc<RagStrategyFactory>,
        chat: Option<Arc<dyn ChatModel>>,
    ) -> Self {
        Self {
            manager,
            strategy_factory,
            chat,
        }
    }

    /// Every collection visible over this surface, excluding the reserved
    /// catalog collection. When `mcp_only` is set, further excludes
    /// collections whose catalog entry has `show_in_mcp = false`.
    ///
    /// # Errors
    /// Propagates the manager's `get_collections`/catalog-load errors.
    pub fn visible_collections(&self, mcp_only: bool) -> Result<Vec<ragcore_store::Collection>, AdapterError> {
        let names = self.manager.get_collections()?;
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let Some(entry) = ragcore_store::Collection::load(&name, &self.manager)? else {
                continue;
            };
            if mcp_only && !entry.show_in_mcp {
                continue;
            }
            out.push(entry);
        }
        Ok(out)
    }

    /// Loads the catalog entry for `name`, erroring with
    /// [`AdapterError::CollectionNotFound`] if there is none.
    ///
    /// # Errors
    /// Returns [`AdapterError::CollectionNotFound`] if the catalog has no
    /// entry for `name`, or propagates a manager/catalog error.
    pub fn require_collection(&self, name: &str) -> Result<ragcore_store::Collection, AdapterError> {
        ragcore_store::Collection::load(name, &self.manager)?
            .ok_or_else(|| AdapterError::CollectionNotFound(name.to_string()))
    }

    /// Retrieves `query` against `collection`'s catalog-configured strategy,
    /// top_k, and score_threshold (overridable by the caller).
    ///
    /// # Errors
    /// Propagates catalog-load, strategy-build, or query errors.
    pub fn retrieve(
        &self,
        collection: &str,
        query: &str,
        top_k: Option<usize>,
        score_threshold: Option<f32>,
    ) -> Result<Vec<RetrievedChunk>, AdapterError> {
        let entry = self.require_collection(collection)?;
        let strategy = self
            .strategy_factory
            .get_strategy(&entry.rag_strategy, entry.use_gpu)?;
        let hits = self.manager.query_points(
            query,
            top_k.unwrap_or(entry.top_k),
            score_threshold.unwrap_or(entry.score_threshold),
            collection,
            &ragcore_store::FilterSpec::new(),
            &strategy,
            None,
        )?;
        Ok(hits.iter().map(RetrievedChunk::from).collect())
    }
}
