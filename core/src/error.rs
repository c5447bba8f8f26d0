//! Shared error kinds.
//!
//! `spec.md` §7 names five behavioral error kinds. They are realized here as
//! variants of one enum rather than five unrelated types so that every crate
//! in the workspace can convert into a single `CoreError` at its boundary
//! while still preserving which behavioral category a failure belongs to.

use thiserror::Error;

/// The five behavioral error categories used throughout the workspace.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unsupported format, invalid URI, empty query, malformed filter.
    /// Surfaced verbatim to the caller; never aborts the enclosing task.
    #[error("input rejected: {0}")]
    InputRejected(String),

    /// Text could not be decoded in any candidate charset.
    #[error("could not decode {source}: {reason}")]
    Decode {
        /// The file or source name that failed to decode.
        source: String,
        /// Human-readable reason (no raw codec internals).
        reason: String,
    },

    /// The LLM or the vector store returned an error.
    #[error("upstream error ({system}): {message}")]
    Upstream {
        /// Which upstream failed (`"llm"` or `"store"`).
        system: &'static str,
        /// Human-readable cause phrase.
        message: String,
    },

    /// Timeouts, stream interruptions. No automatic retry.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Collection not found where expected, schema mismatch. Fatal to the
    /// current operation.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Result type alias used across the workspace.
pub type Result<T> = std::result::Result<T, CoreError>;
