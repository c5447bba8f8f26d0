//! The vector store manager: exclusive owner of the store client.
//!
//! Grounded line-by-line on
//! `original_source/tiny_chat/database/qdrant/qdrant_manager.py::QdrantManager`.

use std::collections::BTreeSet;

use ragcore_core::error::{CoreError, Result};
use ragcore_core::model::{Metadata, SearchHit, VectorField, VectorRecord};
use ragcore_strategy::RetrievalStrategy;
use uuid::Uuid;

use crate::backend::embedded::EmbeddedBackend;
use crate::backend::remote::RemoteBackend;
use crate::backend::{QueryRequest, StoreBackend};
use crate::config::{ConnectionMode, StoreConfig};
use crate::filter::{self, FilterSpec};
use crate::schema::CollectionSchema;

/// Default batch size for [`VectorStoreManager::get_sources`]'s scroll loop.
pub const DEFAULT_SCROLL_BATCH: usize = 1000;

/// Name every deployment's non-deletable default collection carries.
pub const DEFAULT_COLLECTION_NAME: &str = "default";

/// Exclusive owner of the store connection. One manager per process (see
/// [`crate::singleton`]), shared behind an `Arc` by every adapter.
pub struct VectorStoreManager {
    backend: Box<dyn StoreBackend>,
    config: StoreConfig,
}

impl VectorStoreManager {
    /// Connects per `config.connection_mode()`, ensures the catalog
    /// collection exists, and loads or creates the default collection.
    ///
    /// # Errors
    /// Returns [`CoreError::Upstream`] if the backend cannot be reached or
    /// initialized.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let backend: Box<dyn StoreBackend> = match config.connection_mode() {
            ConnectionMode::Remote { url, api_key } => Box::new(
                RemoteBackend::connect_http(&url, api_key.as_deref())
                    .map_err(CoreError::from)?,
            ),
            ConnectionMode::Grpc(url) => {
                Box::new(RemoteBackend::connect_grpc(&url).map_err(CoreError::from)?)
            }
            ConnectionMode::Memory => Box::new(EmbeddedBackend::in_memory()),
            ConnectionMode::LocalFile(path) => {
                Box::new(EmbeddedBackend::local_file(path).map_err(CoreError::from)?)
            }
        };
        let manager = Self { backend, config };
        manager
            .backend
            .ensure_collection(crate::collection::STORED_COLLECTION_NAME, &CollectionSchema {
                dense: None,
                sparse_fields: Vec::new(),
            })
            .map_err(CoreError::from)?;
        Ok(manager)
    }

    /// True iff switching to `new_config` would require a fresh manager.
    #[must_use]
    pub fn is_need_reconnect(&self, new_config: &StoreConfig) -> bool {
        self.config.is_need_reconnect(new_config)
    }

    /// True when the backend is an embedded engine that may not honor
    /// server-side filters (`spec.md` §4.5 step 5).
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        self.backend.is_embedded()
    }

    /// Creates `name` with the vector schema `strategy` needs, if absent.
    ///
    /// # Errors
    /// Returns [`CoreError::Upstream`] on a storage-level failure.
    pub fn ensure_collection(&self, name: &str, strategy: &RetrievalStrategy) -> Result<()> {
        let schema = CollectionSchema::from_strategy(strategy);
        self.backend
            .ensure_collection(name, &schema)
            .map_err(CoreError::from)
    }

    /// Chunks each input text, vectorizes it via `strategy`, and upserts.
    /// Returns one id per input document (its first chunk's id).
    ///
    /// Replaces any existing records sharing a `source` already present in
    /// `metadata`, to keep `(source, page)` unique per revision.
    ///
    /// # Errors
    /// Returns [`CoreError::Upstream`] on a storage-level failure, or
    /// whatever the strategy's embedder raises while vectorizing.
    pub fn add_documents(
        &self,
        texts: &[String],
        metadata: &[Metadata],
        collection: &str,
        strategy: &RetrievalStrategy,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Vec<Uuid>> {
        let mut sources_to_clear = BTreeSet::new();
        for meta in metadata {
            if let Some(source) = meta.get("source") {
                sources_to_clear.insert(source.clone());
            }
        }
        for source in &sources_to_clear {
            let mut filter = FilterSpec::new();
            filter.insert(
                "source".to_string(),
                crate::filter::FilterValue::Scalar(source.clone()),
            );
            self.backend
                .delete_by_filter(collection, &filter)
                .map_err(CoreError::from)?;
        }

        let mut first_ids = Vec::with_capacity(texts.len());
        let mut records = Vec::new();
        for (text, meta) in texts.iter().zip(metadata) {
            let source = meta.get("source").cloned().unwrap_or_default();
            let parent_id = ragcore_core::model::Chunk::derive_parent_id(&source);
            let page: usize = meta.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
            let chunks = ragcore_chunker::split(text, chunk_size, chunk_overlap);
            let chunk_total = chunks.len();
            let mut first = None;
            for (index, chunk_text) in chunks.iter().enumerate() {
                let id = ragcore_core::model::Chunk::derive_id(&source, page, index);
                if first.is_none() {
                    first = Some(id);
                }
                let vectors = strategy
                    .vector(chunk_text)?
                    .into_iter()
                    .map(|(name, value)| (name, to_vector_field(value)))
                    .collect();
                let mut payload = meta.clone();
                payload.insert("text".to_string(), chunk_text.clone());
                payload.insert("source".to_string(), source.clone());
                payload.insert("page".to_string(), page.to_string());
                payload.insert("chunk_index".to_string(), index.to_string());
                payload.insert("chunk_total".to_string(), chunk_total.to_string());
                payload.insert("parent_id".to_string(), parent_id.to_string());
                records.push(VectorRecord { id, vectors, payload });
            }
            first_ids.push(first.unwrap_or(parent_id));
        }
        self.backend
            .upsert(collection, records)
            .map_err(CoreError::from)?;
        Ok(first_ids)
    }

    /// Runs the six-step query algorithm: overfetch for rerank, fused or
    /// single-field query, client-side score threshold, client-side
    /// re-filter in embedded mode, then rerank if present.
    ///
    /// # Errors
    /// Returns [`CoreError::Upstream`] on a storage-level failure, or
    /// whatever the strategy's embedder/reranker raises.
    #[allow(clippy::too_many_arguments)]
    pub fn query_points(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
        collection: &str,
        filter: &FilterSpec,
        strategy: &RetrievalStrategy,
        dense_override: Option<&[f32]>,
    ) -> Result<Vec<SearchHit>> {
        let effective_top_k = top_k * strategy.overfetch_factor();

        let prefetch = strategy.prefetch(query, effective_top_k, dense_override)?;
        let query_value = strategy.query(query, dense_override)?;
        let request = QueryRequest {
            prefetch,
            query: query_value,
            use_vector_name: strategy.use_vector_name(),
            limit: effective_top_k,
            filter: Some(filter.clone()),
        };

        let mut hits = self
            .backend
            .query(collection, &request)
            .map_err(CoreError::from)?;

        hits.retain(|h| h.score >= score_threshold);

        if self.backend.is_embedded() {
            hits.retain(|h| filter::matches(filter, &h.payload));
        }

        strategy.rerank(query, hits, top_k, score_threshold)
    }

    /// Every collection name except the reserved catalog collection.
    ///
    /// # Errors
    /// Returns [`CoreError::Upstream`] on a storage-level failure.
    pub fn get_collections(&self) -> Result<Vec<String>> {
        let mut names = self.backend.list_collections().map_err(CoreError::from)?;
        names.retain(|n| n != crate::collection::STORED_COLLECTION_NAME);
        Ok(names)
    }

    /// Every distinct `source` in `collection`, deduplicated and sorted,
    /// iterated via scroll in batches of [`DEFAULT_SCROLL_BATCH`] up to
    /// `limit` (unbounded if `None`).
    ///
    /// # Errors
    /// Returns [`CoreError::Upstream`] on a storage-level failure.
    pub fn get_sources(&self, collection: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let mut sources = BTreeSet::new();
        let mut cursor = None;
        loop {
            let (hits, next) = self
                .backend
                .scroll(collection, DEFAULT_SCROLL_BATCH, cursor)
                .map_err(CoreError::from)?;
            if hits.is_empty() {
                break;
            }
            for hit in &hits {
                sources.insert(hit.source().to_string());
                if let Some(cap) = limit {
                    if sources.len() >= cap {
                        return Ok(sources.into_iter().collect());
                    }
                }
            }
            cursor = next;
            if cursor.is_none() {
                break;
            }
        }
        Ok(sources.into_iter().collect())
    }

    /// Total record count in `collection`.
    ///
    /// # Errors
    /// Returns [`CoreError::Upstream`] on a storage-level failure.
    pub fn count_documents(&self, collection: &str) -> Result<usize> {
        self.backend.count(collection).map_err(Into::into)
    }

    /// Drops `name`. The default collection cannot be deleted; if `name` is
    /// the currently selected collection, the caller is told which
    /// remaining collection to fall back to.
    ///
    /// # Errors
    /// Returns [`CoreError::InputRejected`] attempting to delete the default
    /// collection, [`CoreError::Upstream`] on a storage-level failure.
    pub fn delete_collection(&self, name: &str) -> Result<Option<String>> {
        if name == DEFAULT_COLLECTION_NAME {
            return Err(crate::error::StoreError::CannotDelete(name.to_string()).into());
        }
        self.backend.delete_collection(name).map_err(CoreError::from)?;
        if self.config.selected_collection_name.as_deref() == Some(name) {
            let remaining = self.get_collections()?;
            return Ok(remaining.into_iter().next());
        }
        Ok(None)
    }

    /// Deletes every record in `collection` matching `filter`.
    ///
    /// # Errors
    /// Returns [`CoreError::Upstream`] on a storage-level failure.
    pub fn delete_by_filter(&self, collection: &str, filter: &FilterSpec) -> Result<usize> {
        self.backend.delete_by_filter(collection, filter).map_err(Into::into)
    }

    /// The low-level backend, exposed for [`crate::collection::Collection`]'s
    /// noop-strategy catalog reads/writes.
    pub(crate) fn backend(&self) -> &dyn StoreBackend {
        self.backend.as_ref()
    }
}

fn to_vector_field(value: ragcore_strategy::VectorValue) -> VectorField {
    match value {
        ragcore_strategy::VectorValue::Sparse(v) => VectorField::Sparse(v),
        ragcore_strategy::VectorValue::Dense(v) => VectorField::Dense(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_strategy::kind::SparseKind;
    use std::sync::Arc as StdArc;

    fn memory_manager() -> VectorStoreManager {
        VectorStoreManager::new(StoreConfig {
            file_path: Some(crate::config::MEMORY_PATH.to_string()),
            server_url: None,
            api_key: None,
            selected_collection_name: None,
        })
        .unwrap()
    }

    struct EchoSparse;
    impl ragcore_core::embedding::SparseEmbedder for EchoSparse {
        fn embed(
            &self,
            texts: &[String],
        ) -> ragcore_core::error::Result<Vec<ragcore_core::embedding::SparseVector>> {
            Ok(texts
                .iter()
                .map(|t| ragcore_core::embedding::SparseVector::new(vec![(t.len() as i32, 1.0)]))
                .collect())
        }
    }

    #[test]
    fn add_documents_then_count_matches_chunk_total() {
        let manager = memory_manager();
        let strategy = RetrievalStrategy::SparseOnly {
            kind: SparseKind::Bm25,
            embedder: StdArc::new(EchoSparse),
        };
        manager.ensure_collection("docs", &strategy).unwrap();
        let mut meta = Metadata::new();
        meta.insert("source".to_string(), "a.txt".to_string());
        let ids = manager
            .add_documents(&["hello world".to_string()], &[meta], "docs", &strategy, 1000, 0)
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(manager.count_documents("docs").unwrap(), 1);
    }

    #[test]
    fn reingesting_same_source_replaces_previous_chunks() {
        let manager = memory_manager();
        let strategy = RetrievalStrategy::SparseOnly {
            kind: SparseKind::Bm25,
            embedder: StdArc::new(EchoSparse),
        };
        manager.ensure_collection("docs", &strategy).unwrap();
        let mut meta = Metadata::new();
        meta.insert("source".to_string(), "a.txt".to_string());
        manager
            .add_documents(&["first version".to_string()], &[meta.clone()], "docs", &strategy, 1000, 0)
            .unwrap();
        manager
            .add_documents(&["second version".to_string()], &[meta], "docs", &strategy, 1000, 0)
            .unwrap();
        assert_eq!(manager.count_documents("docs").unwrap(), 1);
    }

    #[test]
    fn default_collection_cannot_be_deleted() {
        let manager = memory_manager();
        let err = manager.delete_collection(DEFAULT_COLLECTION_NAME).unwrap_err();
        assert!(matches!(err, CoreError::InputRejected(_)));
    }

    #[test]
    fn get_collections_excludes_catalog() {
        let manager = memory_manager();
        let names = manager.get_collections().unwrap();
        assert!(!names.contains(&crate::collection::STORED_COLLECTION_NAME.to_string()));
    }
}
