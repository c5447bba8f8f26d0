//! `(strategy_tag, use_gpu)`-keyed strategy factory.
//!
//! Grounded on `original_source/tiny_chat/database/qdrant/rag_strategy.py`'s
//! `RagStrategyFactory.get_strategy`: a static dictionary keyed by
//! `f"{strategy_name}_{use_gpu}"`, reimplemented with `dashmap` instead of a
//! module-level Python dict plus GIL.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use ragcore_chunker::tokenizer::{JapaneseTokenizer, PassthroughTokenizer, SparseTokenizer};
use ragcore_core::error::{CoreError, Result};
use ragcore_embedding::{
    Bm25Embedder, CrossEncoderReranker, OnnxDenseEmbedder, SpladeEmbedder,
};

use crate::kind::{DenseModel, SparseKind};
use crate::strategy::RetrievalStrategy;

/// Builds and caches [`RetrievalStrategy`] instances by strategy name and
/// GPU preference, so collections configured identically share one loaded
/// backend rather than reloading it per collection.
///
/// Model files are expected under `model_root/<model_name>/{model.onnx,
/// tokenizer.json}`, mirroring the teacher's per-model cache-directory
/// convention (`ort`'s `from_directory` constructors).
pub struct RagStrategyFactory {
    cache: DashMap<(String, bool), RetrievalStrategy>,
    model_root: PathBuf,
}

impl RagStrategyFactory {
    /// Creates a factory rooted at `model_root`.
    #[must_use]
    pub fn new(model_root: impl Into<PathBuf>) -> Self {
        Self {
            cache: DashMap::new(),
            model_root: model_root.into(),
        }
    }

    /// Returns the cached strategy for `(strategy_name, use_gpu)`, building
    /// and caching it on first use. Unknown strategy names fall back to
    /// [`RetrievalStrategy::Noop`], mirroring the Python original's
    /// `else: strategy = NoopRAGStrategy()` branch.
    ///
    /// # Errors
    /// Returns [`CoreError::Invariant`] if the named strategy's model files
    /// cannot be loaded.
    pub fn get_strategy(&self, strategy_name: &str, use_gpu: bool) -> Result<RetrievalStrategy> {
        let name = strategy_name.to_lowercase();
        let key = (name.clone(), use_gpu);
        if let Some(existing) = self.cache.get(&key) {
            return Ok(existing.clone());
        }
        let strategy = self.build(&name, use_gpu)?;
        self.cache.insert(key, strategy.clone());
        Ok(strategy)
    }

    /// Number of strategies currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// True if no strategy has been built yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn model_dir(&self, model_name: &str) -> PathBuf {
        self.model_root.join(model_name)
    }

    fn dense_backend(&self, model_name: &str, use_gpu: bool) -> Result<Arc<OnnxDenseEmbedder>> {
        OnnxDenseEmbedder::from_directory_with_gpu(self.model_dir(model_name), use_gpu)
            .map(Arc::new)
            .map_err(|e| invariant(model_name, &e))
    }

    fn splade_backend(&self, model_name: &str) -> Result<Arc<SpladeEmbedder>> {
        SpladeEmbedder::from_directory(self.model_dir(model_name))
            .map(Arc::new)
            .map_err(|e| invariant(model_name, &e))
    }

    fn crossencoder_backend(&self, model_name: &str) -> Result<Arc<CrossEncoderReranker>> {
        CrossEncoderReranker::from_directory(self.model_dir(model_name))
            .map(Arc::new)
            .map_err(|e| invariant(model_name, &e))
    }

    fn bm25_backend(&self) -> Arc<Bm25Embedder> {
        Arc::new(Bm25Embedder::new(japanese_or_passthrough()))
    }

    #[cfg(feature = "bm42")]
    fn bm42_backend(&self, model_name: &str) -> Result<Arc<ragcore_embedding::Bm42Embedder>> {
        ragcore_embedding::Bm42Embedder::from_directory(self.model_dir(model_name))
            .map(Arc::new)
            .map_err(|e| invariant(model_name, &e))
    }

    fn build(&self, name: &str, use_gpu: bool) -> Result<RetrievalStrategy> {
        match name {
            "bm25" => Ok(RetrievalStrategy::SparseOnly {
                kind: SparseKind::Bm25,
                embedder: self.bm25_backend(),
            }),
            #[cfg(feature = "bm42")]
            "bm42" => Ok(RetrievalStrategy::SparseOnly {
                kind: SparseKind::Bm42,
                embedder: self.bm42_backend("bm42")?,
            }),
            "splade_ja" => Ok(RetrievalStrategy::SparseOnly {
                kind: SparseKind::Splade,
                embedder: self.splade_backend("japanese-splade-v2")?,
            }),
            "bm25_splade" => Ok(RetrievalStrategy::SparseRrf {
                kind_a: SparseKind::Bm25,
                a: self.bm25_backend(),
                kind_b: SparseKind::Splade,
                b: self.splade_backend("japanese-splade-v2")?,
            }),
            "bm25_sbert" => Ok(RetrievalStrategy::HybridRrf {
                sparse_kind: SparseKind::Bm25,
                sparse: self.bm25_backend(),
                dense_model: DenseModel::new("sbert"),
                dense: self.dense_backend("sbert", use_gpu)?,
            }),
            "bm25_sbert_rerank" => Ok(RetrievalStrategy::HybridRrfRerank {
                sparse_kind: SparseKind::Bm25,
                sparse: self.bm25_backend(),
                dense_model: DenseModel::new("sbert"),
                dense: self.dense_backend("sbert", use_gpu)?,
                reranker: self.crossencoder_backend("cross-encoder")?,
            }),
            "splade_sbert" => Ok(RetrievalStrategy::HybridRrf {
                sparse_kind: SparseKind::Splade,
                sparse: self.splade_backend("japanese-splade-v2")?,
                dense_model: DenseModel::new("sbert"),
                dense: self.dense_backend("sbert", use_gpu)?,
            }),
            "splade_sbert_rerank" => Ok(RetrievalStrategy::HybridRrfRerank {
                sparse_kind: SparseKind::Splade,
                sparse: self.splade_backend("japanese-splade-v2")?,
                dense_model: DenseModel::new("sbert"),
                dense: self.dense_backend("sbert", use_gpu)?,
                reranker: self.crossencoder_backend("cross-encoder")?,
            }),
            other if other.starts_with("dense:") => {
                let model_name = &other["dense:".len()..];
                Ok(RetrievalStrategy::DenseOnly {
                    model: DenseModel::new(model_name),
                    embedder: self.dense_backend(model_name, use_gpu)?,
                })
            }
            _ => Ok(RetrievalStrategy::Noop),
        }
    }
}

fn japanese_or_passthrough() -> Box<dyn SparseTokenizer> {
    match JapaneseTokenizer::new() {
        Ok(t) => Box::new(t),
        Err(_) => Box::new(PassthroughTokenizer::english()),
    }
}

fn invariant(model_name: &str, e: &impl std::fmt::Display) -> CoreError {
    CoreError::Invariant(format!("failed to load model '{model_name}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strategy_name_falls_back_to_noop() {
        let factory = RagStrategyFactory::new(Path::new("/nonexistent/models"));
        let strategy = factory.get_strategy("totally_unknown_strategy", false).unwrap();
        assert_eq!(strategy.tag(), "noop");
    }

    #[test]
    fn bm25_strategy_builds_without_model_files() {
        let factory = RagStrategyFactory::new(Path::new("/nonexistent/models"));
        let strategy = factory.get_strategy("bm25", false).unwrap();
        assert_eq!(strategy.tag(), "bm25");
    }

    #[test]
    fn cache_is_keyed_by_name_and_gpu() {
        let factory = RagStrategyFactory::new(Path::new("/nonexistent/models"));
        factory.get_strategy("bm25", false).unwrap();
        factory.get_strategy("bm25", true).unwrap();
        factory.get_strategy("bm25", false).unwrap();
        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn strategy_name_is_case_insensitive() {
        let factory = RagStrategyFactory::new(Path::new("/nonexistent/models"));
        factory.get_strategy("BM25", false).unwrap();
        factory.get_strategy("bm25", false).unwrap();
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn unreachable_model_directory_is_an_invariant_error() {
        let factory = RagStrategyFactory::new(Path::new("/nonexistent/models"));
        let err = factory.get_strategy("dense:ruri-v3-30m", false).unwrap_err();
        assert!(matches!(err, CoreError::Invariant(_)));
    }
}
