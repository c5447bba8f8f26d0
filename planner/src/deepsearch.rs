//! The DeepSearch iteration loop: repeatedly search, evaluate, and refine a
//! sub-query until evaluation stops asking for more or `eval_iter` rounds
//! are spent.
//!
//! Grounded on `original_source/tiny_chat/chat/app.py`'s `rag_search`/
//! `rag_web_search` (the section driving `QueryPlanner.evaluate` in a
//! bounded loop per decomposed sub-query, then merging every sub-query's
//! accumulated results). This crate has no store dependency, so the actual
//! vector search is injected as a closure rather than called directly —
//! the orchestrating adapter supplies `search`.

use std::collections::HashSet;

use ragcore_core::model::SearchHit;

use crate::merge::result_merge;
use crate::planner::QueryPlanner;
use crate::schema::QueryResponse;

/// A vector-store search callback: given query text, returns hits (or an
/// error, which ends that sub-query's loop early).
pub type SearchFn<'a> = dyn FnMut(&str) -> ragcore_core::error::Result<Vec<SearchHit>> + 'a;

/// Runs the bounded evaluate/refine loop for one sub-query, merging every
/// round's valid results round-robin. Stops after `eval_iter` rounds, or
/// as soon as a round's evaluation doesn't request a follow-up query, or
/// as soon as `search` errors.
#[must_use]
pub fn deep_search_subquery(
    planner: &QueryPlanner,
    question: &str,
    mut query: QueryResponse,
    eval_iter: usize,
    search: &mut SearchFn<'_>,
) -> Vec<SearchHit> {
    let mut full_result: Vec<Vec<SearchHit>> = Vec::new();
    let mut knowledge = String::new();
    let mut exists_valid_list = HashSet::new();
    let mut black_list = HashSet::new();

    for _ in 0..eval_iter.max(1) {
        let Ok(results) = search(&query.query) else {
            break;
        };
        let Ok(outcome) = planner.evaluate(
            question,
            &query,
            &results,
            &knowledge,
            &mut exists_valid_list,
            &mut black_list,
        ) else {
            break;
        };
        knowledge = outcome.knowledge;
        if !outcome.valid_results.is_empty() {
            full_result.push(outcome.valid_results);
        }
        match outcome.new_query {
            Some(next) => query = next,
            None => break,
        }
    }

    result_merge(&full_result, &black_list)
}

/// Decomposes `question` into sub-queries, runs each through
/// [`deep_search_subquery`] (or a single flat search, when `use_deep` is
/// false), merges every sub-query's results round-robin, and truncates to
/// `top_k`.
#[must_use]
pub fn deep_search(
    planner: &QueryPlanner,
    question: &str,
    eval_iter: usize,
    use_deep: bool,
    top_k: usize,
    search: &mut SearchFn<'_>,
) -> Vec<SearchHit> {
    let decomposition = planner.transform(question);
    let mut full_result: Vec<Vec<SearchHit>> = Vec::new();

    for sub_query in decomposition.queries {
        if use_deep {
            let merged = deep_search_subquery(planner, question, sub_query, eval_iter, &mut *search);
            if !merged.is_empty() {
                full_result.push(merged);
            }
        } else if let Ok(results) = search(&sub_query.query) {
            if !results.is_empty() {
                full_result.push(results);
            }
        }
    }

    result_merge(&full_result, &HashSet::new())
        .into_iter()
        .take(top_k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::chat::{CancelToken, ChatMessage, ChatModel};
    use ragcore_core::error::{CoreError, Result};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct FailingChat;
    impl ChatModel for FailingChat {
        fn flavor(&self) -> ragcore_core::chat::ServerFlavor {
            ragcore_core::chat::ServerFlavor::Other
        }
        fn complete(&self, _messages: &[ChatMessage], _cancel: &CancelToken) -> Result<String> {
            Err(CoreError::Transient("down".to_string()))
        }
    }

    fn hit(source: &str, page: usize) -> SearchHit {
        let mut payload = BTreeMap::new();
        payload.insert("source".to_string(), source.to_string());
        payload.insert("page".to_string(), page.to_string());
        payload.insert("text".to_string(), "text".to_string());
        SearchHit {
            id: uuid::Uuid::nil(),
            score: 1.0,
            payload,
        }
    }

    #[test]
    fn subquery_loop_stops_at_eval_iter_when_llm_always_fails() {
        let planner = QueryPlanner::new(Arc::new(FailingChat), 3, None);
        let mut calls = 0;
        let mut search: Box<SearchFn<'_>> = Box::new(|_q| {
            calls += 1;
            Ok(vec![hit("a", 1)])
        });
        let query = QueryResponse {
            reason: "r".to_string(),
            query: "q".to_string(),
        };
        let results = deep_search_subquery(&planner, "question", query, 2, &mut search);
        assert_eq!(calls, 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn flat_search_path_skips_evaluate_entirely() {
        let planner = QueryPlanner::new(Arc::new(FailingChat), 3, None);
        let mut search: Box<SearchFn<'_>> = Box::new(|_q| Ok(vec![hit("a", 1)]));
        let results = deep_search(&planner, "question", 2, false, 10, &mut search);
        assert_eq!(results.len(), 1);
    }
}
