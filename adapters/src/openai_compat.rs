//! OpenAI-compatible `/v1/chat/completions` + `/v1/models` surface.
//!
//! Grounded on `original_source/tiny_chat/api/compat_openai.py`: the
//! request's `model` field is interpreted as a collection name; if it names
//! an MCP-visible collection, the last user message is retrieved against
//! that collection and the top hits are appended to the message before
//! proxying to the actual LLM (`spec.md` §6).

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use ragcore_core::chat::{CancelToken, ChatMessage, Role};
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::state::AppState;

/// Builds the `/v1/chat/completions` + `/v1/models` router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .with_state(state)
}

/// One message in an OpenAI-style chat request.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CompatMessage {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// `POST /v1/chat/completions` request body.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatCompletionRequest {
    /// Interpreted as a collection name, not an LLM model id.
    pub model: String,
    /// Chat transcript; the last user message is the retrieval query.
    pub messages: Vec<CompatMessage>,
}

/// `POST /v1/chat/completions` response body (non-streaming; `spec.md` §1
/// places streaming display out of scope for this adapter).
#[derive(Clone, Debug, Serialize)]
pub struct ChatCompletionResponse {
    /// Always `"chat.completion"`.
    pub object: &'static str,
    /// Echoes the request's `model` (collection name).
    pub model: String,
    /// One non-streamed choice, matching the OpenAI shape's minimal subset.
    pub choices: Vec<Choice>,
}

/// One completion choice.
#[derive(Clone, Debug, Serialize)]
pub struct Choice {
    /// 0, always (this adapter never returns more than one choice).
    pub index: u32,
    /// The assistant's reply, with retrieved context already folded in.
    pub message: CompatMessage,
    /// Always `"stop"`.
    pub finish_reason: &'static str,
}

async fn chat_completions(
    State(state): State<AppState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Json<ChatCompletionResponse>, AdapterError> {
    let Some(chat) = state.chat.clone() else {
        return Err(AdapterError::BadRequest(
            "no upstream chat model configured on this adapter".to_string(),
        ));
    };

    let last_user_index = request
        .messages
        .iter()
        .rposition(|m| m.role == "user")
        .ok_or_else(|| AdapterError::BadRequest("no user message in request".to_string()))?;

    let mut messages = request.messages.clone();

    if state.require_collection(&request.model).is_ok() {
        let query = messages[last_user_index].content.clone();
        let hits = state.retrieve(&request.model, &query, None, None)?;
        if !hits.is_empty() {
            let context = hits
                .iter()
                .map(|h| format!("[{} page:{}]\n{}", h.source, h.page, h.content))
                .collect::<Vec<_>>()
                .join("\n\n");
            messages[last_user_index].content =
                format!("{query}\n\n# Retrieved context\n{context}");
        }
    }

    let chat_messages: Vec<ChatMessage> = messages
        .iter()
        .map(|m| ChatMessage {
            role: match m.role.as_str() {
                "system" => Role::System,
                "assistant" => Role::Assistant,
                _ => Role::User,
            },
            content: m.content.clone(),
        })
        .collect();

    let reply = chat
        .complete(&chat_messages, &CancelToken::new())
        .map_err(AdapterError::Core)?;

    Ok(Json(ChatCompletionResponse {
        object: "chat.completion",
        model: request.model,
        choices: vec![Choice {
            index: 0,
            message: CompatMessage {
                role: "assistant".to_string(),
                content: reply,
            },
            finish_reason: "stop",
        }],
    }))
}

/// One model entry, reusing the OpenAI `/v1/models` shape with a collection
/// name in place of a model id.
#[derive(Clone, Debug, Serialize)]
pub struct ModelEntry {
    /// Collection name.
    pub id: String,
    /// Always `"model"`.
    pub object: &'static str,
}

#[derive(Serialize)]
struct ModelList {
    object: &'static str,
    data: Vec<ModelEntry>,
}

async fn list_models(State(state): State<AppState>) -> Result<Json<ModelList>, AdapterError> {
    let collections = state.visible_collections(true)?;
    Ok(Json(ModelList {
        object: "list",
        data: collections
            .into_iter()
            .map(|c| ModelEntry {
                id: c.name,
                object: "model",
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compat_message_role_defaults_to_user_for_unknown_roles() {
        let role = match "tool" {
            "system" => Role::System,
            "assistant" => Role::Assistant,
            _ => Role::User,
        };
        assert_eq!(role, Role::User);
    }
}
