//! Best-effort server-flavor identification and the Ollama model-unload
//! call.
//!
//! Grounded on `original_source/tiny_chat/utils/llm_utils.py`'s
//! `identify_server` and `reset_ollama_model`: both are pure heuristics over
//! plain HTTP probes, swallowing every transport error rather than
//! propagating it, since a failed probe just means "try the next guess" or
//! "there was nothing to unload".

use std::time::Duration;

use ragcore_core::chat::ServerFlavor;
use reqwest::blocking::Client;
use reqwest::Url;

/// Default probe timeout, matching the Python original's `timeout=3`.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Probes `base_url` to guess which server flavor is listening behind it.
///
/// Tries the Ollama root banner first, then a vLLM-style `/health`
/// endpoint; any transport error during a probe is treated as "that probe
/// didn't match", never surfaced.
#[must_use]
pub fn identify_server(base_url: &str, timeout: Duration) -> ServerFlavor {
    let Some(root) = root_origin(base_url) else {
        return ServerFlavor::Other;
    };

    let client = match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(_) => return ServerFlavor::Other,
    };

    if let Ok(response) = client.get(format!("{root}/")).send() {
        if response.status().is_success() {
            if let Ok(text) = response.text() {
                if text.contains("Ollama is running") {
                    return ServerFlavor::Ollama;
                }
            }
        }
    }

    if let Ok(response) = client.get(format!("{root}/health")).send() {
        if response.status().is_success() {
            return ServerFlavor::Vllm;
        }
    }

    ServerFlavor::Other
}

/// Asks an Ollama server to unload `model` immediately (`keep_alive: 0`).
/// Returns `true` only if the request succeeds with a success status;
/// any failure (including talking to a non-Ollama server) yields `false`.
#[must_use]
pub fn reset_ollama_model(server_url: &str, model: &str) -> bool {
    let Some(root) = root_origin(server_url) else {
        return false;
    };
    let client = Client::new();
    let payload = serde_json::json!({ "model": model, "keep_alive": 0 });
    client
        .post(format!("{root}/api/generate"))
        .json(&payload)
        .send()
        .is_ok_and(|response| response.status().is_success())
}

fn root_origin(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim_end_matches('/')).ok()?;
    let scheme = parsed.scheme();
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_origin_strips_path_and_keeps_port() {
        assert_eq!(
            root_origin("http://localhost:11434/v1"),
            Some("http://localhost:11434".to_string())
        );
    }

    #[test]
    fn root_origin_rejects_malformed_url() {
        assert_eq!(root_origin("not a url"), None);
    }

    #[test]
    fn identify_server_is_other_for_malformed_url() {
        assert_eq!(identify_server("not a url", DEFAULT_PROBE_TIMEOUT), ServerFlavor::Other);
    }

    #[test]
    fn reset_ollama_model_is_false_for_malformed_url() {
        assert!(!reset_ollama_model("not a url", "llama3"));
    }
}
