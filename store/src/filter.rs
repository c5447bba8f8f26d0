//! Structured filter specification.
//!
//! Grounded on `qdrant_manager.py::query_points`/`delete_by_filter`'s
//! filter-building loop: each filter value is either a scalar (exact match)
//! or a list (any-of), values are dropped from the filter when falsy
//! (`None`/empty string/empty list).

use std::collections::BTreeMap;

/// One filter value: either an exact match or an any-of list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    /// Exact match against a single value.
    Scalar(String),
    /// Match if the payload value is any of these.
    AnyOf(Vec<String>),
}

/// A structured filter: payload key to required value.
pub type FilterSpec = BTreeMap<String, FilterValue>;

/// True if a payload matches every condition in `filter`.
///
/// Used both for client-side re-filtering in embedded mode and for the
/// embedded backend's own filter evaluation.
#[must_use]
pub fn matches(filter: &FilterSpec, payload: &ragcore_core::model::Metadata) -> bool {
    filter.iter().all(|(key, value)| {
        let Some(actual) = payload.get(key) else {
            return false;
        };
        match value {
            FilterValue::Scalar(expected) => actual == expected,
            FilterValue::AnyOf(options) => options.iter().any(|o| o == actual),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::model::Metadata;

    fn payload(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn scalar_match_requires_exact_value() {
        let mut filter = FilterSpec::new();
        filter.insert("region".to_string(), FilterValue::Scalar("west".to_string()));
        assert!(matches(&filter, &payload(&[("region", "west")])));
        assert!(!matches(&filter, &payload(&[("region", "east")])));
    }

    #[test]
    fn any_of_match_accepts_any_listed_value() {
        let mut filter = FilterSpec::new();
        filter.insert(
            "region".to_string(),
            FilterValue::AnyOf(vec!["west".to_string(), "north".to_string()]),
        );
        assert!(matches(&filter, &payload(&[("region", "north")])));
        assert!(!matches(&filter, &payload(&[("region", "south")])));
    }

    #[test]
    fn missing_key_never_matches() {
        let mut filter = FilterSpec::new();
        filter.insert("region".to_string(), FilterValue::Scalar("west".to_string()));
        assert!(!matches(&filter, &payload(&[("other", "west")])));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = FilterSpec::new();
        assert!(matches(&filter, &payload(&[])));
    }
}
