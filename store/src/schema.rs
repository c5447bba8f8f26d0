//! Vector schema derived from a [`RetrievalStrategy`] for collection
//! creation.
//!
//! Grounded on `qdrant_manager.py::ensure_collection_exists`'s
//! `vectors_config=strategy.create_vector_config()` /
//! `sparse_vectors_config=strategy.create_sparse_vectors_config()` calls,
//! plus `spec.md` §6's always-INT8/0.99-quantile/always-RAM quantization.

use ragcore_strategy::RetrievalStrategy;

/// Quantile used for scalar quantization on every collection (`spec.md` §4.5/§6).
pub const QUANTIZATION_QUANTILE: f32 = 0.99;

/// The dense and sparse vector field schema a collection is created with.
#[derive(Clone, Debug)]
pub struct CollectionSchema {
    /// Dense field name and dimension, if the strategy has one.
    pub dense: Option<(&'static str, usize)>,
    /// Sparse field names that must carry an IDF modifier.
    pub sparse_fields: Vec<&'static str>,
}

impl CollectionSchema {
    /// Derives the schema a collection needs to serve `strategy`.
    #[must_use]
    pub fn from_strategy(strategy: &RetrievalStrategy) -> Self {
        Self {
            dense: strategy
                .dense_dim()
                .map(|dim| (ragcore_strategy::strategy::DENSE_FIELD, dim)),
            sparse_fields: strategy.sparse_field_names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_strategy::kind::SparseKind;

    #[test]
    fn noop_strategy_has_empty_schema() {
        let schema = CollectionSchema::from_strategy(&RetrievalStrategy::Noop);
        assert!(schema.dense.is_none());
        assert!(schema.sparse_fields.is_empty());
    }

    #[test]
    fn sparse_only_schema_has_one_sparse_field() {
        struct Dummy;
        impl ragcore_core::embedding::SparseEmbedder for Dummy {
            fn embed(
                &self,
                texts: &[String],
            ) -> ragcore_core::error::Result<Vec<ragcore_core::embedding::SparseVector>> {
                Ok(texts
                    .iter()
                    .map(|_| ragcore_core::embedding::SparseVector::default())
                    .collect())
            }
        }
        let strategy = RetrievalStrategy::SparseOnly {
            kind: SparseKind::Bm25,
            embedder: std::sync::Arc::new(Dummy),
        };
        let schema = CollectionSchema::from_strategy(&strategy);
        assert_eq!(schema.sparse_fields, vec!["sparse"]);
        assert!(schema.dense.is_none());
    }
}
