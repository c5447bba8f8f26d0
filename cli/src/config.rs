//! On-disk collection configuration file (`spec.md` §6).
//!
//! The six fields `spec.md` §6 names are split, per DESIGN.md's
//! reconciliation of the two Python sources this was distilled from, across
//! [`ragcore_store::StoreConfig`] (the four manager-level fields) and a
//! per-collection `top_k`/`score_threshold` default carried alongside it
//! here, used only when a collection is first created (afterwards its own
//! catalog entry is authoritative).

use std::path::Path;

use anyhow::{Context, Result};
use ragcore_core::NO_THRESHOLD;
use ragcore_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Default on-disk path for the collection configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "ragcore.json";

/// The on-disk collection configuration file's full shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CliConfig {
    /// Manager-level connection fields.
    #[serde(flatten)]
    pub store: StoreConfig,
    /// Default `top_k` for newly created collections.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Default client-side score threshold for newly created collections.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

fn default_top_k() -> usize {
    5
}

fn default_score_threshold() -> f32 {
    NO_THRESHOLD
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
        }
    }
}

/// Loads the configuration file at `path`, falling back to
/// [`CliConfig::default`] if it does not exist.
///
/// # Errors
/// Returns an error if `path` exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<CliConfig> {
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Saves `config` to `path` as pretty-printed JSON.
///
/// # Errors
/// Returns an error if `path` cannot be written.
pub fn save_config(path: &Path, config: &CliConfig) -> Result<()> {
    let text = serde_json::to_string_pretty(config)?;
    std::fs::write(path, text).with_context(|| format!("writing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_default() {
        let config = load_config(Path::new("/nonexistent/ragcore-test.json")).unwrap();
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("ragcore-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        let mut config = CliConfig::default();
        config.top_k = 9;
        config.store.selected_collection_name = Some("research".to_string());
        save_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.top_k, 9);
        assert_eq!(loaded.store.selected_collection_name, Some("research".to_string()));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
