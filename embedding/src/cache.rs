//! Backend cache keyed by `(strategy_tag, use_gpu)`.
//!
//! Loading an ONNX session is expensive; collections sharing the same
//! sparse/dense kind and GPU preference should share one loaded backend
//! rather than reloading per query. Grounded on `original_source/tiny_chat/database/qdrant/rag_strategy.py`'s module-level model cache dictionaries
//! (`_dense_models`, `_sparse_models`), reimplemented with `dashmap` instead
//! of a `threading.Lock`-guarded dict.

use dashmap::DashMap;
use ragcore_core::embedding::{DenseEmbedder, SparseEmbedder};
use std::sync::Arc;

/// Cache key: a backend kind tag paired with whether GPU execution is
/// requested. Two collections configured identically share one loaded
/// backend even if their names differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendKey {
    /// Backend kind tag, e.g. `"bm25"`, `"splade"`, `"dense:bge-m3"`.
    pub tag: String,
    /// Whether this backend was requested with GPU execution.
    pub use_gpu: bool,
}

impl BackendKey {
    /// Builds a cache key.
    #[must_use]
    pub fn new(tag: impl Into<String>, use_gpu: bool) -> Self {
        Self {
            tag: tag.into(),
            use_gpu,
        }
    }
}

/// Process-wide cache of loaded dense embedding backends.
#[derive(Default)]
pub struct DenseBackendCache {
    entries: DashMap<BackendKey, Arc<dyn DenseEmbedder>>,
}

impl DenseBackendCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached backend for `key`, or loads it with `load` and
    /// caches the result.
    ///
    /// # Errors
    /// Propagates `load`'s error if the backend is not already cached.
    pub fn get_or_load<E, F>(&self, key: BackendKey, load: F) -> Result<Arc<dyn DenseEmbedder>, E>
    where
        F: FnOnce() -> Result<Arc<dyn DenseEmbedder>, E>,
    {
        if let Some(existing) = self.entries.get(&key) {
            return Ok(Arc::clone(&existing));
        }
        let backend = load()?;
        self.entries.insert(key, Arc::clone(&backend));
        Ok(backend)
    }

    /// Number of currently cached backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no backend has been loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide cache of loaded sparse embedding backends.
#[derive(Default)]
pub struct SparseBackendCache {
    entries: DashMap<BackendKey, Arc<dyn SparseEmbedder>>,
}

impl SparseBackendCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached backend for `key`, or loads it with `load` and
    /// caches the result.
    ///
    /// # Errors
    /// Propagates `load`'s error if the backend is not already cached.
    pub fn get_or_load<E, F>(&self, key: BackendKey, load: F) -> Result<Arc<dyn SparseEmbedder>, E>
    where
        F: FnOnce() -> Result<Arc<dyn SparseEmbedder>, E>,
    {
        if let Some(existing) = self.entries.get(&key) {
            return Ok(Arc::clone(&existing));
        }
        let backend = load()?;
        self.entries.insert(key, Arc::clone(&backend));
        Ok(backend)
    }

    /// Number of currently cached backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no backend has been loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::embedding::SparseVector;
    use ragcore_core::error::Result as CoreResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSparse;
    impl SparseEmbedder for CountingSparse {
        fn embed(&self, texts: &[String]) -> CoreResult<Vec<SparseVector>> {
            Ok(texts.iter().map(|_| SparseVector::default()).collect())
        }
    }

    #[test]
    fn second_lookup_reuses_cached_backend() {
        let cache = SparseBackendCache::new();
        let loads = AtomicUsize::new(0);
        let key = BackendKey::new("bm25", false);

        let load = || -> Result<Arc<dyn SparseEmbedder>, EmbeddingLoadError> {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingSparse))
        };

        cache.get_or_load(key.clone(), load).unwrap();
        cache.get_or_load(key, load).unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[derive(Debug)]
    struct EmbeddingLoadError;
    impl std::fmt::Display for EmbeddingLoadError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "load error")
        }
    }
    impl std::error::Error for EmbeddingLoadError {}

    #[test]
    fn different_keys_load_independently() {
        let cache = SparseBackendCache::new();
        cache
            .get_or_load(BackendKey::new("bm25", false), || {
                Ok::<_, EmbeddingLoadError>(Arc::new(CountingSparse) as Arc<dyn SparseEmbedder>)
            })
            .unwrap();
        cache
            .get_or_load(BackendKey::new("splade", false), || {
                Ok::<_, EmbeddingLoadError>(Arc::new(CountingSparse) as Arc<dyn SparseEmbedder>)
            })
            .unwrap();
        assert_eq!(cache.len(), 2);
    }
}
