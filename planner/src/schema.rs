//! JSON-schema-backed structured-output shapes.
//!
//! Grounded on `original_source/tiny_chat/utils/query_preprocessor.py`'s
//! Pydantic models (`QueryResponse`, `QueryResponseList`,
//! `QueryEvaluateResponse`); fields and defaults mirror the Python source
//! exactly so parsing the LLM's structured output round-trips.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One decomposed sub-query with its reasoning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueryResponse {
    /// Why this sub-query was generated.
    pub reason: String,
    /// The sub-query text itself.
    pub query: String,
}

/// A multi-query decomposition result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueryResponseList {
    /// Decomposed sub-queries, in generation order.
    pub queries: Vec<QueryResponse>,
}

/// One DeepSearch evaluation round's verdict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryEvaluateResponse {
    /// 1-based indices (into the evaluated search results) judged relevant.
    #[serde(default)]
    pub valid_index: Vec<usize>,
    /// Accumulated knowledge extracted from the valid results so far.
    #[serde(default)]
    pub knowledge: String,
    /// Whether another search round is warranted.
    #[serde(default)]
    pub search_needed: bool,
    /// The refined query to search next, if `search_needed`.
    #[serde(default)]
    pub new_query: Option<String>,
}

impl Default for QueryEvaluateResponse {
    fn default() -> Self {
        Self {
            valid_index: Vec::new(),
            knowledge: String::new(),
            search_needed: false,
            new_query: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_evaluate_response_parses_with_missing_optional_fields() {
        let parsed: QueryEvaluateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, QueryEvaluateResponse::default());
    }

    #[test]
    fn query_response_list_round_trips() {
        let list = QueryResponseList {
            queries: vec![QueryResponse {
                reason: "decompose".to_string(),
                query: "sub query".to_string(),
            }],
        };
        let json = serde_json::to_string(&list).unwrap();
        let parsed: QueryResponseList = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, list);
    }
}
