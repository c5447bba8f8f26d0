//! Connection configuration and mode resolution.
//!
//! Grounded on `original_source/tiny_chat/database/qdrant/qdrant_manager.py::QdrantManager.__init__`
//! (the `server_url`/`file_path` branch that picks HTTP vs. gRPC vs. embedded)
//! and `original_source/tiny_chat/database/database_config.py` (the four
//! manager-level fields persisted in the on-disk collection configuration
//! file — `top_k`/`score_threshold` live on [`crate::Collection`]
//! instead, per DESIGN.md's reconciliation of the two Python sources).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reserved `file_path` value selecting a pure in-memory store with no
/// on-disk persistence.
pub const MEMORY_PATH: &str = ":memory:";

/// Default local-file path used when neither `server_url` nor an explicit
/// `file_path` is given.
pub const DEFAULT_FILE_PATH: &str = "./qdrant_data";

/// The on-disk collection configuration file's manager-level fields.
/// `top_k`/`score_threshold` are catalog-level instead — see
/// [`crate::Collection`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Local embedded-store path, or `:memory:`. Ignored when `server_url` is set.
    pub file_path: Option<String>,
    /// Remote server URL. `http(s)://` selects the REST transport, `dns://` gRPC.
    pub server_url: Option<String>,
    /// API key for a remote, authenticated server.
    pub api_key: Option<String>,
    /// Name of the collection selected in the UI/config at load time.
    pub selected_collection_name: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_path: Some(DEFAULT_FILE_PATH.to_string()),
            server_url: None,
            api_key: None,
            selected_collection_name: None,
        }
    }
}

impl StoreConfig {
    /// Resolves this configuration into a concrete connection mode.
    #[must_use]
    pub fn connection_mode(&self) -> ConnectionMode {
        if let Some(url) = &self.server_url {
            if url.starts_with("dns://") {
                return ConnectionMode::Grpc(url.clone());
            }
            return ConnectionMode::Remote {
                url: url.clone(),
                api_key: self.api_key.clone(),
            };
        }
        match self.file_path.as_deref() {
            Some(MEMORY_PATH) => ConnectionMode::Memory,
            Some(path) => ConnectionMode::LocalFile(PathBuf::from(path)),
            None => ConnectionMode::LocalFile(PathBuf::from(DEFAULT_FILE_PATH)),
        }
    }

    /// True iff reconnecting to `new` would require tearing down the
    /// current manager and building a fresh one: any of server URL, API key
    /// (only when remote), or file path changed.
    ///
    /// Grounded on `QdrantManager.is_need_reconnect`.
    #[must_use]
    pub fn is_need_reconnect(&self, new: &StoreConfig) -> bool {
        if self.server_url != new.server_url {
            return true;
        }
        if self.server_url.is_some() && self.api_key != new.api_key {
            return true;
        }
        self.file_path != new.file_path
    }
}

/// A resolved connection mode: exactly one of these backs a
/// [`crate::VectorStoreManager`] at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionMode {
    /// `http(s)://` remote server, optionally authenticated.
    Remote {
        /// Server URL.
        url: String,
        /// Optional API key.
        api_key: Option<String>,
    },
    /// `dns://` remote server addressed over gRPC.
    Grpc(String),
    /// Pure in-memory embedded store, no persistence.
    Memory,
    /// Embedded store persisted to a local path.
    LocalFile(PathBuf),
}

impl ConnectionMode {
    /// True for the two embedded (non-remote) modes, where filters must be
    /// re-applied client-side after fetching a possibly over-large `top_k`.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Memory | Self::LocalFile(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_https_url_selects_remote_mode() {
        let config = StoreConfig {
            file_path: None,
            server_url: Some("https://qdrant.example.com".to_string()),
            api_key: Some("key".to_string()),
            selected_collection_name: None,
        };
        assert_eq!(
            config.connection_mode(),
            ConnectionMode::Remote {
                url: "https://qdrant.example.com".to_string(),
                api_key: Some("key".to_string()),
            }
        );
    }

    #[test]
    fn dns_url_selects_grpc_mode() {
        let config = StoreConfig {
            file_path: None,
            server_url: Some("dns://localhost:6334".to_string()),
            api_key: None,
            selected_collection_name: None,
        };
        assert_eq!(
            config.connection_mode(),
            ConnectionMode::Grpc("dns://localhost:6334".to_string())
        );
    }

    #[test]
    fn memory_path_selects_memory_mode() {
        let config = StoreConfig {
            file_path: Some(MEMORY_PATH.to_string()),
            server_url: None,
            api_key: None,
            selected_collection_name: None,
        };
        assert_eq!(config.connection_mode(), ConnectionMode::Memory);
    }

    #[test]
    fn local_path_selects_local_file_mode() {
        let config = StoreConfig {
            file_path: Some("./data".to_string()),
            server_url: None,
            api_key: None,
            selected_collection_name: None,
        };
        assert_eq!(
            config.connection_mode(),
            ConnectionMode::LocalFile(PathBuf::from("./data"))
        );
        assert!(config.connection_mode().is_embedded());
    }

    #[test]
    fn reconnect_needed_on_url_change() {
        let a = StoreConfig::default();
        let mut b = a.clone();
        b.server_url = Some("https://other.example.com".to_string());
        assert!(a.is_need_reconnect(&b));
    }

    #[test]
    fn reconnect_not_needed_when_unchanged() {
        let a = StoreConfig::default();
        let b = a.clone();
        assert!(!a.is_need_reconnect(&b));
    }

    #[test]
    fn reconnect_ignores_api_key_change_when_not_remote() {
        let mut a = StoreConfig::default();
        a.server_url = None;
        let mut b = a.clone();
        b.api_key = Some("irrelevant".to_string());
        assert!(!a.is_need_reconnect(&b));
    }
}
