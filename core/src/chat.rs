//! The external LLM client contract.
//!
//! `spec.md` §1 places the LLM chat server itself out of scope: "we assume a
//! streaming chat-completion client with optional structured-output
//! (JSON-schema-constrained) support." This module describes exactly that
//! assumed interface so the planner can be written and tested against it
//! without depending on a concrete provider crate.

use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;

/// A chat message role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// System/instruction message.
    System,
    /// End-user message.
    User,
    /// Model-authored message.
    Assistant,
}

/// One message in a chat transcript.
#[derive(Clone, Debug)]
pub struct ChatMessage {
    /// Who authored this message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Builds a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Builds a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Which flavor of structured-output mechanism the backend server speaks.
///
/// Grounded on `identify_server`'s root-banner / `/health` probe: the
/// distinction matters only for choosing between a standardized
/// `response_format` object and a backend-specific `guided_json` extension,
/// never for correctness of the actual chat turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerFlavor {
    /// Identified via the Ollama root banner.
    Ollama,
    /// Identified via a responsive `/health` endpoint.
    Vllm,
    /// Neither probe matched; falls back to the standard `response_format`.
    Other,
}

/// A shared flag an orchestrator can set to request cancellation of an
/// in-flight streaming chat call.
///
/// The streaming loop must check this between chunks and break at the next
/// boundary rather than mid-chunk; this type only carries the flag, not the
/// stream itself.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a fresh, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](CancelToken::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A streaming chat-completion client with optional JSON-schema-constrained
/// structured output.
///
/// Implementations are expected to wrap a concrete provider (OpenAI-
/// compatible, vLLM, Ollama); this crate never implements one.
pub trait ChatModel: Send + Sync {
    /// Best-effort identification of the server flavor behind this client.
    /// Heuristic; must never sit on a correctness-critical path.
    fn flavor(&self) -> ServerFlavor;

    /// Sends a chat completion request and returns the full response text.
    ///
    /// Blocks the calling thread until the stream completes, unless
    /// `cancel` is set, in which case it returns the partial text collected
    /// so far with [`CoreError::Transient`](crate::error::CoreError::Transient).
    ///
    /// # Errors
    /// Returns [`CoreError::Upstream`](crate::error::CoreError::Upstream) if
    /// the server returns an error, or
    /// [`CoreError::Transient`](crate::error::CoreError::Transient) on
    /// timeout, stream interruption, or cancellation.
    fn complete(&self, messages: &[ChatMessage], cancel: &CancelToken) -> Result<String>;

    /// Sends a chat completion request constrained to a JSON schema and
    /// deserializes the result into `T`.
    ///
    /// Implementations pick between a standardized `response_format`
    /// parameter and a backend-specific `guided_json` extension based on
    /// [`flavor`](ChatModel::flavor).
    ///
    /// # Errors
    /// Same as [`complete`](ChatModel::complete); additionally returns
    /// [`CoreError::Upstream`](crate::error::CoreError::Upstream) if the
    /// response cannot be parsed as `T` even once.
    fn complete_structured<T: DeserializeOwned>(
        &self,
        messages: &[ChatMessage],
        schema_name: &str,
        schema: &serde_json::Value,
        cancel: &CancelToken,
    ) -> Result<T> {
        let raw = self.complete(messages, cancel)?;
        let _ = schema_name;
        let _ = schema;
        serde_json::from_str(&raw).map_err(|e| {
            crate::error::CoreError::Upstream {
                system: "llm",
                message: format!("structured output did not parse: {e}"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_token_latches() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
