//! Value objects exchanged between a [`RetrievalStrategy`](crate::RetrievalStrategy)
//! and the vector store manager on the read path.

use ragcore_core::embedding::SparseVector;

/// One field's worth of vector value, produced on the write path and stored
/// against a named vector field.
#[derive(Clone, Debug)]
pub enum VectorValue {
    /// A sparse lexical vector.
    Sparse(SparseVector),
    /// A dense semantic vector.
    Dense(Vec<f32>),
}

/// One prefetch leg of a hybrid query: search one named vector field for
/// `limit` candidates, to be fused afterward.
#[derive(Clone, Debug)]
pub struct PrefetchSpec {
    /// Name of the vector field to search.
    pub field: String,
    /// The query vector for this field.
    pub query: VectorValue,
    /// Number of candidates to request from this field.
    pub limit: usize,
}

/// The read-path query instruction a strategy produces.
///
/// Hybrid strategies return [`Fusion`](QueryValue::Fusion) alongside a
/// non-empty `prefetch` list; single-field strategies return the field's
/// query vector directly with an empty prefetch list.
#[derive(Clone, Debug)]
pub enum QueryValue {
    /// Query a single named vector field directly.
    Vector(VectorValue),
    /// Reciprocal-rank-fuse the accompanying prefetch legs.
    Fusion,
}
