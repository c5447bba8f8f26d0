//! The storage backend abstraction: everything [`crate::VectorStoreManager`]
//! needs from either a remote Qdrant server or the embedded fallback.
//!
//! Keeping this as a trait (rather than branching on [`crate::config::ConnectionMode`]
//! throughout the manager) is the same decoupling `spec.md` §4.4 calls out
//! for strategies: the manager does not know storage mechanics, only this
//! contract.

pub mod embedded;
pub mod remote;

use ragcore_core::model::{SearchHit, VectorRecord};
use ragcore_strategy::value::{PrefetchSpec, QueryValue};

use crate::error::StoreError;
use crate::filter::FilterSpec;
use crate::schema::CollectionSchema;

/// One read-path query, fully resolved by a strategy into backend-agnostic pieces.
pub struct QueryRequest {
    /// Hybrid prefetch legs, empty for single-field strategies.
    pub prefetch: Vec<PrefetchSpec>,
    /// The fused or single-field query instruction.
    pub query: QueryValue,
    /// For single-field strategies, the field to query; `None` for hybrid/noop.
    pub use_vector_name: Option<&'static str>,
    /// Maximum number of hits to return.
    pub limit: usize,
    /// Optional structured filter.
    pub filter: Option<FilterSpec>,
}

/// Storage operations the vector store manager delegates to a concrete backend.
pub trait StoreBackend: Send + Sync {
    /// Creates `name` with `schema` and quantization if it does not already exist.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] on a storage-level failure.
    fn ensure_collection(&self, name: &str, schema: &CollectionSchema) -> Result<(), StoreError>;

    /// True if `name` currently exists.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] on a storage-level failure.
    fn collection_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Every collection name currently in the store, including reserved ones.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] on a storage-level failure.
    fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Drops `name` entirely.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] on a storage-level failure.
    fn delete_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Upserts `records` into `collection`.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] on a storage-level failure.
    fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<(), StoreError>;

    /// Runs `request` against `collection` and returns ordered hits (not yet
    /// client-side score-thresholded or reranked — the manager applies both).
    ///
    /// # Errors
    /// Returns [`StoreError::CollectionNotFound`] if the collection is
    /// missing, [`StoreError::Backend`] on any other storage-level failure.
    fn query(&self, collection: &str, request: &QueryRequest) -> Result<Vec<SearchHit>, StoreError>;

    /// Iterates `collection` in batches of `batch_size`, returning the next
    /// batch and a continuation cursor (`None` once exhausted).
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] on a storage-level failure.
    fn scroll(
        &self,
        collection: &str,
        batch_size: usize,
        offset: Option<String>,
    ) -> Result<(Vec<SearchHit>, Option<String>), StoreError>;

    /// Deletes every record in `collection` matching `filter`, returning the
    /// number removed.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] on a storage-level failure.
    fn delete_by_filter(&self, collection: &str, filter: &FilterSpec) -> Result<usize, StoreError>;

    /// Total record count in `collection`.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] on a storage-level failure.
    fn count(&self, collection: &str) -> Result<usize, StoreError>;

    /// True for the embedded backend, where `spec.md` §4.5 step 5/§9 require
    /// the manager to re-apply `filter` client-side because the embedded
    /// engine may not honor server-side filters.
    fn is_embedded(&self) -> bool;
}
