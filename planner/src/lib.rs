//! Query transformation, DeepSearch iteration, and result merging.
//!
//! Grounded on `original_source/tiny_chat/utils/query_preprocessor.py` and
//! `original_source/tiny_chat/utils/llm_utils.py`. Every transform here
//! degrades to a safe default on LLM failure rather than propagating an
//! error — the planner is an accuracy optimization, never a hard
//! dependency of a successful search.

pub mod deepsearch;
pub mod error;
pub mod hyde;
pub mod merge;
pub mod planner;
pub mod schema;
pub mod server_flavor;
pub mod stepback;

pub use deepsearch::{deep_search, deep_search_subquery, SearchFn};
pub use error::PlannerError;
pub use hyde::HypotheticalDocument;
pub use merge::result_merge;
pub use planner::{EvaluateOutcome, QueryPlanner};
pub use schema::{QueryEvaluateResponse, QueryResponse, QueryResponseList};
pub use server_flavor::{identify_server, reset_ollama_model, DEFAULT_PROBE_TIMEOUT};
pub use stepback::StepBackQuery;

use std::sync::LazyLock;

use regex::Regex;

/// Matches a leading `<think>...</think>` block some reasoning models
/// (DeepSeek-R1, Qwen3) prepend to their output.
pub(crate) static THINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?s)<think>.*?</think>").expect("static pattern"));

#[cfg(test)]
mod tests {
    use super::THINK_PATTERN;

    #[test]
    fn think_pattern_strips_leading_reasoning_block() {
        let stripped = THINK_PATTERN.replace("<think>reasoning here</think>answer", "");
        assert_eq!(stripped, "answer");
    }

    #[test]
    fn think_pattern_leaves_text_without_a_think_block_untouched() {
        let stripped = THINK_PATTERN.replace("plain answer", "");
        assert_eq!(stripped, "plain answer");
    }
}
