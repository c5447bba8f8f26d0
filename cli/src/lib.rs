//! Shared support for the three `ragcore` command-line binaries: the
//! `ragcore` chat/db REPL, `ragcore-http` (the HTTP adapter service), and
//! `ragcore-mcp` (the MCP server).
//!
//! Each binary owns one surface rather than hiding all three behind flags
//! on a single monolith, matching how this workspace keeps concerns in
//! separate crates rather than one do-everything binary.

pub mod config;
pub mod db;
pub mod http_chat;
pub mod repl;

pub use config::{load_config, save_config, CliConfig};
pub use http_chat::HttpChatModel;

use std::sync::Arc;

use anyhow::{Context, Result};
use ragcore_store::{StoreConfig, VectorStoreManager};
use ragcore_strategy::RagStrategyFactory;
use tracing_subscriber::EnvFilter;

/// Initializes `tracing` the way every crate in this workspace logs
/// (`tracing-subscriber`'s `fmt` layer with an env-filter), matching the
/// teacher's own binaries.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Builds the process-wide manager and a strategy factory rooted at
/// `model_root`, from a [`StoreConfig`].
///
/// # Errors
/// Propagates [`VectorStoreManager::new`]'s connection error.
pub fn build_manager(
    store_config: &StoreConfig,
    model_root: impl Into<std::path::PathBuf>,
) -> Result<(Arc<VectorStoreManager>, Arc<RagStrategyFactory>)> {
    let manager = ragcore_store::singleton::global(store_config)
        .context("connecting to the vector store")?;
    let factory = Arc::new(RagStrategyFactory::new(model_root));
    Ok((manager, factory))
}
