//! Store-specific errors.

use thiserror::Error;

/// Errors raised by the vector store manager and its backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// Attempted to delete the default collection, or the only remaining
    /// user collection.
    #[error("cannot delete collection: {0}")]
    CannotDelete(String),

    /// A filter referenced a payload key with an unsupported value shape.
    #[error("malformed filter: {0}")]
    MalformedFilter(String),

    /// The underlying store (embedded or remote) returned an error.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A catalog entry could not be (de)serialized.
    #[error("catalog entry error for '{collection}': {message}")]
    Catalog {
        /// Name of the collection whose catalog entry failed.
        collection: String,
        /// Human-readable cause.
        message: String,
    },
}

impl From<StoreError> for ragcore_core::error::CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CollectionNotFound(_) | StoreError::Catalog { .. } => {
                Self::Invariant(e.to_string())
            }
            StoreError::CannotDelete(_) | StoreError::MalformedFilter(_) => {
                Self::InputRejected(e.to_string())
            }
            StoreError::Backend(_) => Self::Upstream {
                system: "store",
                message: e.to_string(),
            },
        }
    }
}

impl From<qdrant_client::QdrantError> for StoreError {
    fn from(e: qdrant_client::QdrantError) -> Self {
        Self::Backend(e.to_string())
    }
}
