//! BM25-family sparse embedding.
//!
//! Grounded on `original_source/tiny_chat/database/embeddings/bm25_embedding.py`:
//! tokenize, then emit the term-frequency-saturation component of the Okapi
//! BM25 formula per token. IDF itself is not computed here — per `spec.md`
//! §4.2, the vector store is told the field carries an IDF modifier and
//! applies the corpus-wide IDF term at query time, the same division of
//! labor `BM25TextEmbedding` delegates to `fastembed`'s `bm25` backend.

use ragcore_chunker::tokenizer::SparseTokenizer;
use ragcore_core::embedding::{SparseEmbedder, SparseVector};
use ragcore_core::error::Result;
use std::collections::HashMap;
use xxhash_rust::xxh32::xxh32;

/// Term-frequency saturation parameter (`k1`), controlling how quickly
/// repeated occurrences of a token saturate its contribution.
const DEFAULT_K: f32 = 1.2;

/// Length normalization parameter (`b`).
const DEFAULT_B: f32 = 0.75;

/// Assumed average document length in tokens, used when the corpus-wide
/// average is not tracked locally (the vector store tracks it instead).
const DEFAULT_AVG_LEN: f32 = 256.0;

/// Tokens beyond this position in a single document are dropped, mirroring
/// `bm25_embedding.py`'s `token_max_length=40`.
const DEFAULT_TOKEN_MAX_LENGTH: usize = 40;

/// BM25-family sparse embedder: tokenizes text, then emits one sparse
/// dimension per distinct token with a term-frequency-saturation weight.
///
/// The token-to-dimension mapping is a 32-bit hash (`xxhash`) of the
/// normalized token string, so no vocabulary file is needed and the
/// dimension space is stable across processes.
pub struct Bm25Embedder {
    tokenizer: Box<dyn SparseTokenizer>,
    k: f32,
    b: f32,
    avg_len: f32,
    token_max_length: usize,
}

impl Bm25Embedder {
    /// Builds a BM25 embedder using the given tokenizer and default
    /// parameters (`k1=1.2`, `b=0.75`, `avg_len=256`, `token_max_length=40`).
    #[must_use]
    pub fn new(tokenizer: Box<dyn SparseTokenizer>) -> Self {
        Self {
            tokenizer,
            k: DEFAULT_K,
            b: DEFAULT_B,
            avg_len: DEFAULT_AVG_LEN,
            token_max_length: DEFAULT_TOKEN_MAX_LENGTH,
        }
    }

    /// Overrides the saturation (`k1`) and length-normalization (`b`)
    /// parameters.
    #[must_use]
    pub const fn with_params(mut self, k: f32, b: f32) -> Self {
        self.k = k;
        self.b = b;
        self
    }

    /// Overrides the assumed average document length.
    #[must_use]
    pub const fn with_avg_len(mut self, avg_len: f32) -> Self {
        self.avg_len = avg_len;
        self
    }

    fn encode(&self, text: &str) -> SparseVector {
        let mut tokens = self.tokenizer.tokenize(text);
        tokens.truncate(self.token_max_length);

        if tokens.is_empty() {
            return SparseVector::new(Vec::new());
        }

        let doc_len = tokens.len() as f32;
        let mut counts: HashMap<u32, f32> = HashMap::new();
        for token in &tokens {
            let dim = token_dimension(token);
            *counts.entry(dim).or_insert(0.0) += 1.0;
        }

        let norm = 1.0 - self.b + self.b * (doc_len / self.avg_len);
        let pairs = counts
            .into_iter()
            .map(|(dim, tf)| {
                #[allow(clippy::cast_possible_wrap)]
                let index = dim as i32;
                let weight = (tf * (self.k + 1.0)) / (tf + self.k * norm);
                (index, weight)
            })
            .collect();

        SparseVector::new(pairs)
    }
}

/// Hashes a normalized token into a stable, non-negative 32-bit dimension.
fn token_dimension(token: &str) -> u32 {
    (xxh32(token.as_bytes(), 0) & 0x7fff_ffff) as u32
}

impl SparseEmbedder for Bm25Embedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        Ok(texts.iter().map(|t| self.encode(t)).collect())
    }

    fn query_embed(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        self.embed(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_chunker::tokenizer::PassthroughTokenizer;

    fn embedder() -> Bm25Embedder {
        Bm25Embedder::new(Box::new(PassthroughTokenizer::english()))
    }

    #[test]
    fn empty_text_yields_empty_vector() {
        let v = embedder().encode("   ");
        assert!(v.is_empty());
    }

    #[test]
    fn repeated_token_gets_higher_weight_than_single_occurrence() {
        let repeated = embedder().encode("rust rust rust");
        let single = embedder().encode("rust other word");
        let repeated_weight = repeated.values[0];
        let single_idx = single
            .indices
            .iter()
            .position(|&i| i == repeated.indices[0])
            .expect("rust token present");
        assert!(repeated_weight > single.values[single_idx]);
    }

    #[test]
    fn indices_are_sorted() {
        let v = embedder().encode("the quick brown fox jumps over the lazy dog");
        let mut sorted = v.indices.clone();
        sorted.sort_unstable();
        assert_eq!(v.indices, sorted);
    }

    #[test]
    fn token_max_length_truncates_long_documents() {
        let long_text = (0..100)
            .map(|i| format!("token{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let v = embedder().encode(&long_text);
        assert!(v.indices.len() <= DEFAULT_TOKEN_MAX_LENGTH);
    }

    #[test]
    fn query_embed_matches_embed() {
        let e = embedder();
        let a = e.encode("hybrid retrieval");
        let b = &e.query_embed(&["hybrid retrieval".to_string()]).unwrap()[0];
        assert_eq!(a.indices, b.indices);
    }
}
