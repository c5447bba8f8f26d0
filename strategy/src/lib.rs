//! Closed-enum retrieval strategies: the write-path/read-path contract for
//! one vector schema, plus the `(strategy_tag, use_gpu)`-keyed factory that
//! caches constructed strategies across collections.
//!
//! Grounded on `original_source/tiny_chat/database/qdrant/rag_strategy.py`,
//! reworked from an ABC/subclass hierarchy into a single tagged `enum` with a
//! `match`-dispatched `impl` block per `spec.md` §9's explicit instruction to
//! avoid open-class inheritance for a closed variant set.

pub mod factory;
pub mod kind;
pub mod strategy;
pub mod value;

pub use factory::RagStrategyFactory;
pub use kind::{DenseModel, SparseKind};
pub use strategy::RetrievalStrategy;
pub use value::{PrefetchSpec, QueryValue, VectorValue};
