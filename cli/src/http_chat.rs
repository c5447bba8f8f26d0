//! A [`ChatModel`] backed by a blocking HTTP client against an
//! OpenAI-compatible `/v1/chat/completions` endpoint.
//!
//! No concrete provider crate (OpenAI/Ollama/vLLM SDK) ships in this
//! workspace; every provider speaks the same wire shape, so one small
//! `reqwest::blocking` client stands in for all of them, matching how
//! `ragcore_adapters::openai_compat` proxies the other direction.

use ragcore_core::chat::{CancelToken, ChatMessage, ChatModel, Role, ServerFlavor};
use ragcore_core::error::{CoreError, Result};
use ragcore_planner::server_flavor::{identify_server, DEFAULT_PROBE_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request timeout for a chat completion call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A blocking OpenAI-compatible chat client.
pub struct HttpChatModel {
    base_url: String,
    model: String,
    api_key: Option<String>,
    flavor: ServerFlavor,
    client: reqwest::blocking::Client,
}

impl HttpChatModel {
    /// Connects to `base_url` (e.g. `http://localhost:11434/v1`), probing it
    /// once via [`identify_server`] to pick the right structured-output
    /// extension up front.
    ///
    /// # Errors
    /// Returns [`CoreError::Transient`] if the client cannot be built.
    pub fn connect(base_url: &str, model: &str, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| CoreError::Transient(e.to_string()))?;
        let flavor = identify_server(base_url, DEFAULT_PROBE_TIMEOUT);
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            flavor,
            client,
        })
    }

    fn request(&self, messages: &[ChatMessage], response_format: Option<serde_json::Value>) -> Result<String> {
        let body = CompletionRequest {
            model: self.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            response_format,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().map_err(|e| CoreError::Transient(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CoreError::Upstream {
                system: "llm",
                message: format!("chat completion returned {}", response.status()),
            });
        }
        let parsed: CompletionResponse = response
            .json()
            .map_err(|e| CoreError::Upstream { system: "llm", message: e.to_string() })?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CoreError::Upstream { system: "llm", message: "empty choices".to_string() })
    }
}

impl ChatModel for HttpChatModel {
    fn flavor(&self) -> ServerFlavor {
        self.flavor
    }

    fn complete(&self, messages: &[ChatMessage], cancel: &CancelToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(CoreError::Transient("cancelled before send".to_string()));
        }
        self.request(messages, None)
    }

    fn complete_structured<T: serde::de::DeserializeOwned>(
        &self,
        messages: &[ChatMessage],
        schema_name: &str,
        schema: &serde_json::Value,
        cancel: &CancelToken,
    ) -> Result<T> {
        if cancel.is_cancelled() {
            return Err(CoreError::Transient("cancelled before send".to_string()));
        }
        let response_format = match self.flavor {
            ServerFlavor::Ollama => serde_json::json!({ "format": schema }),
            ServerFlavor::Vllm => serde_json::json!({ "guided_json": schema }),
            ServerFlavor::Other => serde_json::json!({
                "type": "json_schema",
                "json_schema": { "name": schema_name, "schema": schema },
            }),
        };
        let raw = self.request(messages, Some(response_format))?;
        serde_json::from_str(&raw)
            .map_err(|e| CoreError::Upstream { system: "llm", message: format!("structured output did not parse: {e}") })
    }
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: message.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_message_maps_roles() {
        let wire = WireMessage::from(&ChatMessage::user("hi"));
        assert_eq!(wire.role, "user");
        assert_eq!(wire.content, "hi");
    }
}
