//! # ragcore-core
//!
//! Trait abstractions shared by every crate in the ragcore workspace: the
//! embedding backends, the retrieval strategies, the vector store manager,
//! the ingestion pipeline, and the query planner all speak these types and
//! nothing else.
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────────┐
//! │  chunker     │──▶│  embedding     │──▶│  strategy        │
//! │ (split text) │   │ (dense/sparse) │   │ (vector schema)  │
//! └──────────────┘   └────────────────┘   └──────────────────┘
//!                                                   │
//!                                                   ▼
//!                                          ┌──────────────────┐
//!                                          │  store           │
//!                                          │ (Qdrant manager) │
//!                                          └──────────────────┘
//! ```
//!
//! ## Scheduling model
//!
//! Every trait in this crate is **synchronous**. The system is written for a
//! multi-threaded, blocking runtime: a search, ingest, or plan request runs
//! on its own worker thread, and within that thread operations block rather
//! than yield to a cooperative scheduler. There is no `async fn` anywhere in
//! this crate.
//!
//! ## Modules
//!
//! - [`embedding`] — dense and sparse vector production.
//! - [`chat`] — the external LLM client contract (chat completion + structured output + cancellation).
//! - [`rerank`] — cross-encoder reranking.
//! - [`error`] — the five behavioral error kinds shared across the workspace.
//! - [`model`] — the data model: documents, pages, chunks, search hits.

pub mod chat;
pub mod embedding;
pub mod error;
pub mod model;
pub mod rerank;

pub use chat::ChatModel;
pub use embedding::{DenseEmbedder, SparseEmbedder, SparseVector};
pub use error::{CoreError, Result};
pub use rerank::Reranker;

/// Sentinel score threshold meaning "no threshold, accept any match".
///
/// Replaces the `score_threshold = -1.0` convention load-bearing in the
/// system this crate's contract was distilled from; callers that mean "any
/// score is acceptable" should use this constant rather than a magic
/// literal.
pub const NO_THRESHOLD: f32 = f32::NEG_INFINITY;
