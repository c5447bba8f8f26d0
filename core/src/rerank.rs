//! Cross-encoder reranking.

use crate::error::Result;
use crate::model::SearchHit;

/// Reorders a batch of hits by a cross-encoder relevance score.
///
/// Implementations keep only hits scoring at or above the caller's
/// threshold and truncate to `top_k`. When a reranker is present on a
/// strategy, the preceding retrieval step over-fetches by 2x to give it
/// headroom (`spec.md` §4.4/§4.5).
pub trait Reranker: Send + Sync {
    /// Reranks `hits` against `query`, filters by `score_threshold`, and
    /// truncates to `top_k`. Results are sorted by rerank score descending.
    ///
    /// # Errors
    /// Returns an error if the underlying model fails to score a hit.
    fn rerank(
        &self,
        query: &str,
        hits: Vec<SearchHit>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    struct LengthReranker;

    impl Reranker for LengthReranker {
        fn rerank(
            &self,
            _query: &str,
            mut hits: Vec<SearchHit>,
            top_k: usize,
            score_threshold: f32,
        ) -> Result<Vec<SearchHit>> {
            for hit in &mut hits {
                hit.score = hit.text().len() as f32;
            }
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.retain(|h| h.score >= score_threshold);
            hits.truncate(top_k);
            Ok(hits)
        }
    }

    fn hit(text: &str) -> SearchHit {
        let mut payload = BTreeMap::new();
        payload.insert("text".to_string(), text.to_string());
        SearchHit {
            id: Uuid::nil(),
            score: 0.0,
            payload,
        }
    }

    #[test]
    fn rerank_sorts_and_truncates() {
        let reranker = LengthReranker;
        let hits = vec![hit("a"), hit("abc"), hit("ab")];
        let out = reranker.rerank("q", hits, 2, 0.0).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text(), "abc");
        assert_eq!(out[1].text(), "ab");
    }

    #[test]
    fn rerank_applies_threshold() {
        let reranker = LengthReranker;
        let hits = vec![hit("a"), hit("abc")];
        let out = reranker.rerank("q", hits, 10, 2.0).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text(), "abc");
    }
}
