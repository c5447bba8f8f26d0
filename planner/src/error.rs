//! Planner-specific errors.

use thiserror::Error;

/// Errors raised by planner internals that are not simply absorbed by a
/// fallback (most are: every transform/evaluate call degrades to its
/// input on failure rather than propagating an error).
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The LLM's structured-output response could not be parsed as the
    /// expected schema even once.
    #[error("planner response did not parse: {0}")]
    MalformedResponse(String),
}

impl From<PlannerError> for ragcore_core::error::CoreError {
    fn from(e: PlannerError) -> Self {
        Self::Upstream {
            system: "planner",
            message: e.to_string(),
        }
    }
}
