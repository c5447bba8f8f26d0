//! Dense and sparse embedding traits.
//!
//! Both traits are synchronous: a call may block the calling thread on
//! inference (ONNX Runtime, a loaded model) but never yields to an async
//! executor. See the [crate-level docs](crate) for the scheduling model.

use crate::error::Result;

/// Converts text into a fixed-dimension dense vector.
///
/// Prefix policy (corpus marker vs. query marker) is a property of the
/// backend, not of the caller: implementations that need asymmetric
/// query/passage prefixes apply them internally in [`embed`](DenseEmbedder::embed)
/// and [`query_embed`](DenseEmbedder::query_embed) respectively.
pub trait DenseEmbedder: Send + Sync {
    /// Dimension of vectors produced by this backend.
    fn dim(&self) -> usize;

    /// Embeds a batch of documents for indexing.
    ///
    /// # Errors
    /// Returns an error if inference fails for any input.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embeds a batch of queries for retrieval.
    ///
    /// Defaults to [`embed`](DenseEmbedder::embed); backends whose underlying
    /// model was trained with asymmetric query/passage prefixes override
    /// this.
    ///
    /// # Errors
    /// Returns an error if inference fails for any input.
    fn query_embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts)
    }
}

/// A sparse vector: parallel `indices`/`values` arrays, one entry per
/// nonzero lexical dimension.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseVector {
    /// Dimension indices of nonzero entries (stable hashes for learned
    /// sparse backends, vocabulary ids for lexical ones).
    pub indices: Vec<i32>,
    /// Weights corresponding to each index.
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Builds a sparse vector from parallel index/value slices, sorted by index.
    #[must_use]
    pub fn new(mut pairs: Vec<(i32, f32)>) -> Self {
        pairs.sort_unstable_by_key(|(idx, _)| *idx);
        let (indices, values) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// True if this vector carries no nonzero dimensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Converts text into a sparse lexical vector (BM25, SPLADE, BM42).
///
/// Implementations that are IDF-weighted (BM25) should document that the
/// vector store must apply an IDF modifier at query time; this trait itself
/// carries no such flag, as it is a property of the collection's strategy,
/// not of an individual vector.
pub trait SparseEmbedder: Send + Sync {
    /// Produces sparse vectors for a batch of documents.
    ///
    /// # Errors
    /// Returns an error only for backend-level failures (model load,
    /// inference); tokenization failures never propagate here — they yield
    /// an empty [`SparseVector`] for that input.
    fn embed(&self, texts: &[String]) -> Result<Vec<SparseVector>>;

    /// Produces sparse vectors for a batch of queries.
    ///
    /// # Errors
    /// See [`embed`](SparseEmbedder::embed).
    fn query_embed(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        self.embed(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockDense {
        dimension: usize,
    }

    impl DenseEmbedder for MockDense {
        fn dim(&self) -> usize {
            self.dimension
        }

        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let len = t.len() as f32;
                    (0..self.dimension).map(|i| (len + i as f32) * 0.01).collect()
                })
                .collect())
        }
    }

    #[test]
    fn dense_embedder_dimension() {
        let model = MockDense { dimension: 768 };
        assert_eq!(model.dim(), 768);
    }

    #[test]
    fn dense_embedder_batches() {
        let model = MockDense { dimension: 4 };
        let out = model.embed(&["a".into(), "ab".into()]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 4);
        assert_ne!(out[0][0], out[1][0]);
    }

    #[test]
    fn dense_embedder_query_embed_defaults_to_embed() {
        let model = MockDense { dimension: 2 };
        let a = model.embed(&["x".into()]).unwrap();
        let b = model.query_embed(&["x".into()]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sparse_vector_sorts_by_index() {
        let v = SparseVector::new(vec![(3, 0.1), (1, 0.9), (2, 0.5)]);
        assert_eq!(v.indices, vec![1, 2, 3]);
        assert_eq!(v.values, vec![0.9, 0.5, 0.1]);
    }

    #[test]
    fn sparse_vector_empty() {
        let v = SparseVector::default();
        assert!(v.is_empty());
    }
}
