//! Sparse (BM25, SPLADE, experimental BM42) and dense (ONNX) embedding
//! backends, a cross-encoder reranker, and a process-wide backend cache.
//!
//! Sparse and cross-encoder backends implement [`ragcore_core::embedding::SparseEmbedder`],
//! [`ragcore_core::embedding::DenseEmbedder`], and [`ragcore_core::rerank::Reranker`]
//! respectively, so [`ragcore_strategy`](../ragcore_strategy/index.html) can
//! dispatch to them without knowing their concrete types.

pub mod bm25;
#[cfg(feature = "bm42")]
pub mod bm42;
pub mod cache;
pub mod crossencoder;
pub mod dense;
pub mod error;
pub mod pooling;
pub mod splade;

pub use bm25::Bm25Embedder;
#[cfg(feature = "bm42")]
pub use bm42::Bm42Embedder;
pub use cache::{BackendKey, DenseBackendCache, SparseBackendCache};
pub use crossencoder::CrossEncoderReranker;
pub use dense::{OnnxDenseEmbedder, OnnxDenseEmbedderBuilder};
pub use error::EmbeddingError;
pub use pooling::{PoolingStrategy, l2_normalize};
pub use splade::SpladeEmbedder;
