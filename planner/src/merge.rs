//! Round-robin result merging across parallel sub-query searches.
//!
//! Grounded on `original_source/tiny_chat/utils/query_preprocessor.py::QueryPlanner.result_merge`:
//! interleave each sub-query's result list one position at a time (so no
//! single sub-query's results dominate the head of the merged list),
//! skipping anything blacklisted or already seen.

use std::collections::HashSet;

use ragcore_core::model::SearchHit;

/// Interleaves `full_result`'s lists round-robin, preserving each list's
/// internal order, skipping hits whose `(source, page)` key is in
/// `black_list` or has already been emitted.
#[must_use]
pub fn result_merge(full_result: &[Vec<SearchHit>], black_list: &HashSet<(String, usize)>) -> Vec<SearchHit> {
    let mut merged = Vec::new();
    let mut seen_keys = HashSet::new();

    let max_len = full_result.iter().map(Vec::len).max().unwrap_or(0);
    for item_idx in 0..max_len {
        for result_list in full_result {
            let Some(item) = result_list.get(item_idx) else {
                continue;
            };
            let key = item.source_page_key();
            if black_list.contains(&key) || seen_keys.contains(&key) {
                continue;
            }
            seen_keys.insert(key);
            merged.push(item.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn hit(source: &str, page: usize, score: f32) -> SearchHit {
        let mut payload = BTreeMap::new();
        payload.insert("source".to_string(), source.to_string());
        payload.insert("page".to_string(), page.to_string());
        payload.insert("text".to_string(), "x".to_string());
        SearchHit {
            id: uuid::Uuid::nil(),
            score,
            payload,
        }
    }

    #[test]
    fn interleaves_round_robin_preserving_list_order() {
        let lists = vec![
            vec![hit("a", 1, 0.9), hit("a", 2, 0.8)],
            vec![hit("b", 1, 0.95)],
        ];
        let merged = result_merge(&lists, &HashSet::new());
        let keys: Vec<_> = merged.iter().map(SearchHit::source_page_key).collect();
        assert_eq!(
            keys,
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 1),
                ("a".to_string(), 2),
            ]
        );
    }

    #[test]
    fn skips_blacklisted_and_duplicate_keys() {
        let lists = vec![
            vec![hit("a", 1, 0.9)],
            vec![hit("a", 1, 0.5), hit("b", 1, 0.4)],
        ];
        let mut black_list = HashSet::new();
        black_list.insert(("c".to_string(), 1));
        let merged = result_merge(&lists, &black_list);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source_page_key(), ("a".to_string(), 1));
        assert_eq!(merged[1].source_page_key(), ("b".to_string(), 1));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(result_merge(&[], &HashSet::new()).is_empty());
    }
}
