//! The closed `RetrievalStrategy` enum: write-path vectorization and
//! read-path query-shape dispatch for one vector schema.
//!
//! `spec.md` §3 closes the set at five variants (`sparse_only`,
//! `dense_only`, `hybrid_rrf`, `hybrid_rrf_rerank`, `noop`). `SPEC_FULL.md`
//! §3 adds a sixth, `SparseRrf`, grounded on
//! `original_source/tiny_chat/database/qdrant/rag_strategy.py`'s `SpaceRRF`
//! (two sparse fields fused by RRF, no dense field) — present in the system
//! this spec was distilled from and cheap to carry under the same dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use ragcore_core::embedding::{DenseEmbedder, SparseEmbedder};
use ragcore_core::error::Result;
use ragcore_core::model::SearchHit;
use ragcore_core::rerank::Reranker;

use crate::kind::{DenseModel, SparseKind};
use crate::value::{PrefetchSpec, QueryValue, VectorValue};

/// Name of the single dense vector field for `dense_only`/hybrid strategies.
pub const DENSE_FIELD: &str = "dense";

/// Name of the single sparse vector field for `sparse_only`/hybrid strategies.
pub const SPARSE_FIELD: &str = "sparse";

/// The closed set of retrieval strategies. Immutable after construction and
/// shared by value (behind an `Arc`, via [`crate::RagStrategyFactory`])
/// across threads and collections.
#[derive(Clone)]
pub enum RetrievalStrategy {
    /// One sparse vector field.
    SparseOnly {
        /// Which sparse family.
        kind: SparseKind,
        /// The loaded backend.
        embedder: Arc<dyn SparseEmbedder>,
    },
    /// One dense vector field of fixed dimension.
    DenseOnly {
        /// Model tag.
        model: DenseModel,
        /// The loaded backend.
        embedder: Arc<dyn DenseEmbedder>,
    },
    /// Both a sparse and a dense field, queried with RRF fusion.
    HybridRrf {
        /// Sparse family.
        sparse_kind: SparseKind,
        /// Loaded sparse backend.
        sparse: Arc<dyn SparseEmbedder>,
        /// Dense model tag.
        dense_model: DenseModel,
        /// Loaded dense backend.
        dense: Arc<dyn DenseEmbedder>,
    },
    /// Hybrid plus cross-encoder reranking. Retrieval over-fetches by 2x to
    /// give the reranker headroom.
    HybridRrfRerank {
        /// Sparse family.
        sparse_kind: SparseKind,
        /// Loaded sparse backend.
        sparse: Arc<dyn SparseEmbedder>,
        /// Dense model tag.
        dense_model: DenseModel,
        /// Loaded dense backend.
        dense: Arc<dyn DenseEmbedder>,
        /// Loaded cross-encoder reranker.
        reranker: Arc<dyn Reranker>,
    },
    /// Two sparse vector fields fused by RRF, no dense field.
    ///
    /// Added per `SPEC_FULL.md` §3, grounded on `rag_strategy.py`'s
    /// `SpaceRRF`; not part of `spec.md`'s closed five-variant set.
    SparseRrf {
        /// First sparse family (also its field name, via [`SparseKind::tag`]).
        kind_a: SparseKind,
        /// First loaded sparse backend.
        a: Arc<dyn SparseEmbedder>,
        /// Second sparse family (also its field name).
        kind_b: SparseKind,
        /// Second loaded sparse backend.
        b: Arc<dyn SparseEmbedder>,
    },
    /// Catalog/descriptor only, no embeddings.
    Noop,
}

impl std::fmt::Debug for RetrievalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tag())
    }
}

impl RetrievalStrategy {
    /// Cache/catalog tag for this strategy, e.g. `"bm25"`, `"hybrid_rrf:bm25+ruri-v3-30m"`.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::SparseOnly { kind, .. } => kind.tag().to_string(),
            Self::DenseOnly { model, .. } => model.to_string(),
            Self::HybridRrf {
                sparse_kind,
                dense_model,
                ..
            } => format!("hybrid_rrf:{sparse_kind}+{dense_model}"),
            Self::HybridRrfRerank {
                sparse_kind,
                dense_model,
                ..
            } => format!("hybrid_rrf_rerank:{sparse_kind}+{dense_model}"),
            Self::SparseRrf { kind_a, kind_b, .. } => format!("sparse_rrf:{kind_a}+{kind_b}"),
            Self::Noop => "noop".to_string(),
        }
    }

    /// Write path: produces the fields to upsert for one piece of text.
    ///
    /// # Errors
    /// Propagates the underlying backend's embedding error.
    pub fn vector(&self, text: &str) -> Result<BTreeMap<String, VectorValue>> {
        let texts = [text.to_string()];
        let mut out = BTreeMap::new();
        match self {
            Self::SparseOnly { embedder, .. } => {
                let v = first(embedder.embed(&texts)?);
                out.insert(SPARSE_FIELD.to_string(), VectorValue::Sparse(v));
            }
            Self::DenseOnly { embedder, .. } => {
                let v = first(embedder.embed(&texts)?);
                out.insert(DENSE_FIELD.to_string(), VectorValue::Dense(v));
            }
            Self::HybridRrf { sparse, dense, .. } | Self::HybridRrfRerank { sparse, dense, .. } => {
                let s = first(sparse.embed(&texts)?);
                let d = first(dense.embed(&texts)?);
                out.insert(SPARSE_FIELD.to_string(), VectorValue::Sparse(s));
                out.insert(DENSE_FIELD.to_string(), VectorValue::Dense(d));
            }
            Self::SparseRrf {
                kind_a,
                a,
                kind_b,
                b,
            } => {
                let va = first(a.embed(&texts)?);
                let vb = first(b.embed(&texts)?);
                out.insert(kind_a.tag().to_string(), VectorValue::Sparse(va));
                out.insert(kind_b.tag().to_string(), VectorValue::Sparse(vb));
            }
            Self::Noop => {}
        }
        Ok(out)
    }

    /// Read path: one prefetch leg per vector field for hybrid strategies,
    /// empty for single-field strategies.
    ///
    /// # Errors
    /// Propagates the underlying backend's embedding error.
    pub fn prefetch(
        &self,
        query: &str,
        top_k: usize,
        dense_query_override: Option<&[f32]>,
    ) -> Result<Vec<PrefetchSpec>> {
        let texts = [query.to_string()];
        let specs = match self {
            Self::HybridRrf { sparse, dense, .. } | Self::HybridRrfRerank { sparse, dense, .. } => {
                let s = first(sparse.query_embed(&texts)?);
                let d = match dense_query_override {
                    Some(v) => v.to_vec(),
                    None => first(dense.query_embed(&texts)?),
                };
                vec![
                    PrefetchSpec {
                        field: SPARSE_FIELD.to_string(),
                        query: VectorValue::Sparse(s),
                        limit: top_k,
                    },
                    PrefetchSpec {
                        field: DENSE_FIELD.to_string(),
                        query: VectorValue::Dense(d),
                        limit: top_k,
                    },
                ]
            }
            Self::SparseRrf {
                kind_a,
                a,
                kind_b,
                b,
            } => {
                let va = first(a.query_embed(&texts)?);
                let vb = first(b.query_embed(&texts)?);
                vec![
                    PrefetchSpec {
                        field: kind_a.tag().to_string(),
                        query: VectorValue::Sparse(va),
                        limit: top_k,
                    },
                    PrefetchSpec {
                        field: kind_b.tag().to_string(),
                        query: VectorValue::Sparse(vb),
                        limit: top_k,
                    },
                ]
            }
            Self::SparseOnly { .. } | Self::DenseOnly { .. } | Self::Noop => Vec::new(),
        };
        Ok(specs)
    }

    /// Read path: the query instruction for this strategy.
    ///
    /// # Errors
    /// Propagates the underlying backend's embedding error.
    pub fn query(&self, text: &str, dense_override: Option<&[f32]>) -> Result<QueryValue> {
        let texts = [text.to_string()];
        let value = match self {
            Self::SparseOnly { embedder, .. } => {
                QueryValue::Vector(VectorValue::Sparse(first(embedder.query_embed(&texts)?)))
            }
            Self::DenseOnly { embedder, .. } => {
                let v = match dense_override {
                    Some(v) => v.to_vec(),
                    None => first(embedder.query_embed(&texts)?),
                };
                QueryValue::Vector(VectorValue::Dense(v))
            }
            Self::HybridRrf { .. } | Self::HybridRrfRerank { .. } | Self::SparseRrf { .. } => {
                QueryValue::Fusion
            }
            Self::Noop => QueryValue::Vector(VectorValue::Sparse(
                ragcore_core::embedding::SparseVector::default(),
            )),
        };
        Ok(value)
    }

    /// For single-field strategies, the field to query against. `None` for
    /// hybrid strategies (which query via [`prefetch`](Self::prefetch) + fusion) and for [`Noop`](Self::Noop).
    #[must_use]
    pub fn use_vector_name(&self) -> Option<&'static str> {
        match self {
            Self::SparseOnly { .. } => Some(SPARSE_FIELD),
            Self::DenseOnly { .. } => Some(DENSE_FIELD),
            Self::HybridRrf { .. }
            | Self::HybridRrfRerank { .. }
            | Self::SparseRrf { .. }
            | Self::Noop => None,
        }
    }

    /// Dimension of the dense field, if this strategy has one.
    #[must_use]
    pub fn dense_dim(&self) -> Option<usize> {
        match self {
            Self::DenseOnly { embedder, .. } => Some(embedder.dim()),
            Self::HybridRrf { dense, .. } | Self::HybridRrfRerank { dense, .. } => {
                Some(dense.dim())
            }
            Self::SparseOnly { .. } | Self::SparseRrf { .. } | Self::Noop => None,
        }
    }

    /// Names of every sparse vector field this strategy writes, each of
    /// which the store must be told carries an IDF modifier.
    #[must_use]
    pub fn sparse_field_names(&self) -> Vec<&'static str> {
        match self {
            Self::SparseOnly { .. } => vec![SPARSE_FIELD],
            Self::HybridRrf { .. } | Self::HybridRrfRerank { .. } => vec![SPARSE_FIELD],
            Self::SparseRrf { kind_a, kind_b, .. } => vec![kind_a.tag(), kind_b.tag()],
            Self::DenseOnly { .. } | Self::Noop => Vec::new(),
        }
    }

    /// True if this strategy has a reranking stage.
    #[must_use]
    pub fn has_rerank(&self) -> bool {
        matches!(self, Self::HybridRrfRerank { .. })
    }

    /// Retrieval over-fetch multiplier: `2` when a reranker is present so it
    /// has headroom, `1` otherwise (`spec.md` §4.4/§4.5).
    #[must_use]
    pub fn overfetch_factor(&self) -> usize {
        if self.has_rerank() { 2 } else { 1 }
    }

    /// Reorders `hits` by cross-encoder score, keeps only those at or above
    /// `score_threshold`, and truncates to `top_k`. A no-op (returns `hits`
    /// unchanged) for strategies without a reranker.
    ///
    /// # Errors
    /// Propagates the underlying reranker's scoring error.
    pub fn rerank(
        &self,
        query: &str,
        hits: Vec<SearchHit>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        match self {
            Self::HybridRrfRerank { reranker, .. } => {
                reranker.rerank(query, hits, top_k, score_threshold)
            }
            _ => Ok(hits),
        }
    }
}

fn first<T: Default>(mut v: Vec<T>) -> T {
    if v.is_empty() { T::default() } else { v.swap_remove(0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::embedding::SparseVector;
    use ragcore_core::error::Result as CoreResult;

    struct EchoSparse;
    impl SparseEmbedder for EchoSparse {
        fn embed(&self, texts: &[String]) -> CoreResult<Vec<SparseVector>> {
            Ok(texts
                .iter()
                .map(|t| SparseVector::new(vec![(t.len() as i32, 1.0)]))
                .collect())
        }
    }

    struct EchoDense(usize);
    impl DenseEmbedder for EchoDense {
        fn dim(&self) -> usize {
            self.0
        }
        fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; self.0]).collect())
        }
    }

    #[test]
    fn sparse_only_vector_uses_sparse_field() {
        let strategy = RetrievalStrategy::SparseOnly {
            kind: SparseKind::Bm25,
            embedder: Arc::new(EchoSparse),
        };
        let out = strategy.vector("hello").unwrap();
        assert!(out.contains_key(SPARSE_FIELD));
        assert!(!out.contains_key(DENSE_FIELD));
        assert_eq!(strategy.use_vector_name(), Some(SPARSE_FIELD));
        assert_eq!(strategy.overfetch_factor(), 1);
    }

    #[test]
    fn dense_only_vector_uses_dense_field() {
        let strategy = RetrievalStrategy::DenseOnly {
            model: DenseModel::new("ruri-v3-30m"),
            embedder: Arc::new(EchoDense(4)),
        };
        let out = strategy.vector("hello").unwrap();
        assert!(out.contains_key(DENSE_FIELD));
        assert_eq!(strategy.dense_dim(), Some(4));
    }

    #[test]
    fn hybrid_prefetch_has_two_legs() {
        let strategy = RetrievalStrategy::HybridRrf {
            sparse_kind: SparseKind::Bm25,
            sparse: Arc::new(EchoSparse),
            dense_model: DenseModel::new("ruri-v3-30m"),
            dense: Arc::new(EchoDense(4)),
        };
        let legs = strategy.prefetch("q", 5, None).unwrap();
        assert_eq!(legs.len(), 2);
        assert!(matches!(strategy.query("q", None).unwrap(), QueryValue::Fusion));
        assert_eq!(strategy.use_vector_name(), None);
    }

    #[test]
    fn hybrid_rerank_overfetches() {
        struct PassthroughReranker;
        impl Reranker for PassthroughReranker {
            fn rerank(
                &self,
                _query: &str,
                hits: Vec<SearchHit>,
                top_k: usize,
                _score_threshold: f32,
            ) -> Result<Vec<SearchHit>> {
                let mut hits = hits;
                hits.truncate(top_k);
                Ok(hits)
            }
        }
        let strategy = RetrievalStrategy::HybridRrfRerank {
            sparse_kind: SparseKind::Bm25,
            sparse: Arc::new(EchoSparse),
            dense_model: DenseModel::new("ruri-v3-30m"),
            dense: Arc::new(EchoDense(4)),
            reranker: Arc::new(PassthroughReranker),
        };
        assert_eq!(strategy.overfetch_factor(), 2);
        assert!(strategy.has_rerank());
    }

    #[test]
    fn sparse_rrf_uses_kind_tags_as_field_names() {
        let strategy = RetrievalStrategy::SparseRrf {
            kind_a: SparseKind::Bm25,
            a: Arc::new(EchoSparse),
            kind_b: SparseKind::Splade,
            b: Arc::new(EchoSparse),
        };
        let out = strategy.vector("hello").unwrap();
        assert!(out.contains_key("bm25"));
        assert!(out.contains_key("splade"));
        assert_eq!(strategy.sparse_field_names(), vec!["bm25", "splade"]);
    }

    #[test]
    fn noop_strategy_produces_no_vectors() {
        let strategy = RetrievalStrategy::Noop;
        let out = strategy.vector("hello").unwrap();
        assert!(out.is_empty());
        assert_eq!(strategy.use_vector_name(), None);
        assert_eq!(strategy.dense_dim(), None);
    }

    #[test]
    fn tag_distinguishes_variants() {
        let sparse = RetrievalStrategy::SparseOnly {
            kind: SparseKind::Bm25,
            embedder: Arc::new(EchoSparse),
        };
        assert_eq!(sparse.tag(), "bm25");
        assert_eq!(RetrievalStrategy::Noop.tag(), "noop");
    }
}
