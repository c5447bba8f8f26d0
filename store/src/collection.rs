//! The self-describing per-collection catalog entry.
//!
//! Grounded on `original_source/tiny_chat/database/qdrant/collection.py`.
//! Every user collection has exactly one record in the reserved
//! [`STORED_COLLECTION_NAME`] collection, written with the `Noop` strategy
//! (description text stored as payload, never embedded).

use std::collections::BTreeMap;

use ragcore_core::error::Result;
use ragcore_core::model::Metadata;
use uuid::Uuid;

use crate::filter::{FilterSpec, FilterValue};
use crate::manager::VectorStoreManager;

/// Name of the reserved collection holding every [`Collection`]'s catalog entry.
pub const STORED_COLLECTION_NAME: &str = "collection_descriptions";

/// A logical collection's self-describing configuration, persisted as one
/// record inside [`STORED_COLLECTION_NAME`].
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    /// Collection name, also the catalog filter key.
    pub name: String,
    /// Free-text description, also the MCP tool description when exposed.
    pub description: String,
    /// Chunk size used to index this collection.
    pub chunk_size: usize,
    /// Chunk overlap used to index this collection.
    pub chunk_overlap: usize,
    /// Default number of hits to return for a query.
    pub top_k: usize,
    /// Default client-side score threshold.
    pub score_threshold: f32,
    /// Strategy tag this collection was indexed with.
    pub rag_strategy: String,
    /// Whether the strategy's embedders should prefer GPU execution.
    pub use_gpu: bool,
    /// Whether this collection is exposed as an MCP `search-<name>` tool.
    pub show_in_mcp: bool,
}

impl Collection {
    fn to_payload(&self) -> Metadata {
        let mut payload = BTreeMap::new();
        payload.insert("collection_name".to_string(), self.name.clone());
        payload.insert("text".to_string(), self.description.clone());
        payload.insert("chunk_size".to_string(), self.chunk_size.to_string());
        payload.insert("chunk_overlap".to_string(), self.chunk_overlap.to_string());
        payload.insert("top_k".to_string(), self.top_k.to_string());
        payload.insert("score_threshold".to_string(), self.score_threshold.to_string());
        payload.insert("rag_strategy".to_string(), self.rag_strategy.clone());
        payload.insert("use_gpu".to_string(), self.use_gpu.to_string());
        payload.insert("show_in_mcp".to_string(), self.show_in_mcp.to_string());
        payload
    }

    fn from_payload(payload: &Metadata) -> Option<Self> {
        Some(Self {
            name: payload.get("collection_name")?.clone(),
            description: payload.get("text").cloned().unwrap_or_default(),
            chunk_size: payload.get("chunk_size")?.parse().ok()?,
            chunk_overlap: payload.get("chunk_overlap")?.parse().ok()?,
            top_k: payload.get("top_k")?.parse().ok()?,
            score_threshold: payload.get("score_threshold")?.parse().ok()?,
            rag_strategy: payload.get("rag_strategy").cloned().unwrap_or_default(),
            use_gpu: payload
                .get("use_gpu")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            show_in_mcp: payload
                .get("show_in_mcp")
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        })
    }

    /// Upserts this entry into the catalog, replacing any existing one with
    /// the same name (delete-then-insert, matching [`update_description`]'s
    /// convention so a save is always idempotent by name).
    ///
    /// # Errors
    /// Propagates the manager's upsert error.
    pub fn save(&self, manager: &VectorStoreManager) -> Result<()> {
        let mut filter = FilterSpec::new();
        filter.insert(
            "collection_name".to_string(),
            FilterValue::Scalar(self.name.clone()),
        );
        manager
            .backend()
            .delete_by_filter(STORED_COLLECTION_NAME, &filter)
            .map_err(ragcore_core::error::CoreError::from)?;

        let id = Uuid::new_v5(&Uuid::NAMESPACE_DNS, self.name.as_bytes());
        let record = ragcore_core::model::VectorRecord {
            id,
            vectors: BTreeMap::new(),
            payload: self.to_payload(),
        };
        manager
            .backend()
            .upsert(STORED_COLLECTION_NAME, vec![record])
            .map_err(Into::into)
    }

    /// Loads the catalog entry for `name`, if one exists. A missing entry is
    /// `Ok(None)`, never an error.
    ///
    /// # Errors
    /// Propagates the manager's query error.
    pub fn load(name: &str, manager: &VectorStoreManager) -> Result<Option<Self>> {
        let mut filter = FilterSpec::new();
        filter.insert(
            "collection_name".to_string(),
            FilterValue::Scalar(name.to_string()),
        );
        let request = crate::backend::QueryRequest {
            prefetch: Vec::new(),
            query: ragcore_strategy::QueryValue::Vector(
                ragcore_strategy::VectorValue::Sparse(Default::default()),
            ),
            use_vector_name: None,
            limit: 1,
            filter: Some(filter),
        };
        let hits = manager
            .backend()
            .query(STORED_COLLECTION_NAME, &request)
            .map_err(ragcore_core::error::CoreError::from)?;
        Ok(hits.first().and_then(|h| Self::from_payload(&h.payload)))
    }

    /// Updates the description of `name`'s catalog entry, re-saving the
    /// mutated instance rather than reconstructing one from defaults.
    ///
    /// # Errors
    /// Returns [`ragcore_core::error::CoreError::Invariant`] if no entry for
    /// `name` exists; otherwise propagates the manager's save error.
    pub fn update_description(
        name: &str,
        new_description: &str,
        manager: &VectorStoreManager,
    ) -> Result<()> {
        let Some(mut existing) = Self::load(name, manager)? else {
            return Err(ragcore_core::error::CoreError::Invariant(format!(
                "no catalog entry for collection '{name}'"
            )));
        };
        existing.description = new_description.to_string();
        existing.save(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn memory_manager() -> VectorStoreManager {
        VectorStoreManager::new(StoreConfig {
            file_path: Some(crate::config::MEMORY_PATH.to_string()),
            server_url: None,
            api_key: None,
            selected_collection_name: None,
        })
        .unwrap()
    }

    fn sample(name: &str) -> Collection {
        Collection {
            name: name.to_string(),
            description: "a test collection".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 7,
            score_threshold: 0.31,
            rag_strategy: "bm25".to_string(),
            use_gpu: false,
            show_in_mcp: true,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let manager = memory_manager();
        let entry = sample("research");
        entry.save(&manager).unwrap();
        let loaded = Collection::load("research", &manager).unwrap().unwrap();
        assert_eq!(loaded, entry);
    }

    #[test]
    fn load_missing_entry_is_none_not_error() {
        let manager = memory_manager();
        let loaded = Collection::load("never-saved", &manager).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn save_twice_replaces_rather_than_duplicates() {
        let manager = memory_manager();
        let mut entry = sample("research");
        entry.save(&manager).unwrap();
        entry.top_k = 20;
        entry.save(&manager).unwrap();
        let loaded = Collection::load("research", &manager).unwrap().unwrap();
        assert_eq!(loaded.top_k, 20);
    }

    #[test]
    fn update_description_preserves_other_fields() {
        let manager = memory_manager();
        let entry = sample("research");
        entry.save(&manager).unwrap();
        Collection::update_description("research", "revised text", &manager).unwrap();
        let loaded = Collection::load("research", &manager).unwrap().unwrap();
        assert_eq!(loaded.description, "revised text");
        assert_eq!(loaded.top_k, 7);
        assert_eq!(loaded.score_threshold, 0.31);
    }

    #[test]
    fn update_description_on_missing_entry_is_an_error() {
        let manager = memory_manager();
        let err = Collection::update_description("ghost", "x", &manager).unwrap_err();
        assert!(matches!(err, ragcore_core::error::CoreError::Invariant(_)));
    }
}
