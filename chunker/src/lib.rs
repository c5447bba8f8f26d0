//! Hierarchical separator-cascade text chunking and sparse-path tokenization.
//!
//! Two independent pieces live in this crate: [`split`], the text splitter
//! every collection uses to turn one document's text into indexable chunks,
//! and [`tokenizer`], the morpheme/stopword pipeline that feeds the sparse
//! (BM25/SPLADE) embedding backends.

pub mod splitter;
pub mod tokenizer;

pub use splitter::split;
pub use tokenizer::{SparseTokenizer, JapaneseTokenizer, PassthroughTokenizer};
