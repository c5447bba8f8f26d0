//! Strategy-variant tags used for cache keys and collection catalog entries.

use std::fmt;

/// Which sparse embedding family a `sparse_only`/hybrid strategy uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SparseKind {
    /// Okapi BM25 term-frequency-saturation weighting, IDF applied by the store.
    Bm25,
    /// Learned term expansion (SPLADE).
    Splade,
    /// Attention-derived sparse weights. Experimental, see `spec.md` §4.3/§9.
    Bm42,
}

impl SparseKind {
    /// Short tag used in cache keys, vector field names for [`RetrievalStrategy::SparseRrf`](crate::RetrievalStrategy::SparseRrf), and catalog entries.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Bm25 => "bm25",
            Self::Splade => "splade",
            Self::Bm42 => "bm42",
        }
    }
}

impl fmt::Display for SparseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Which dense embedding model a `dense_only`/hybrid strategy uses.
///
/// Carries the model name verbatim (as `rag_strategy.py`'s `strategy`
/// string does, e.g. `"cl-nagoya/ruri-v3-30m"`) rather than a closed set,
/// since new sentence-transformer checkpoints are added without code
/// changes — only the cache key and model-directory lookup depend on it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DenseModel(pub String);

impl DenseModel {
    /// Wraps a model name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The model name, used as a cache-key component and model-directory name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DenseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_kind_tags() {
        assert_eq!(SparseKind::Bm25.tag(), "bm25");
        assert_eq!(SparseKind::Splade.tag(), "splade");
        assert_eq!(SparseKind::Bm42.tag(), "bm42");
    }

    #[test]
    fn dense_model_tag_roundtrip() {
        let model = DenseModel::new("cl-nagoya/ruri-v3-30m");
        assert_eq!(model.tag(), "cl-nagoya/ruri-v3-30m");
        assert_eq!(model.to_string(), "cl-nagoya/ruri-v3-30m");
    }
}
