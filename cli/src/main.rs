//! `ragcore`: the chat/db REPL binary.
//!
//! Two subcommands — `chat` starts the interactive search/DeepSearch REPL
//! (optionally against a configured chat model), `db` runs one collection-
//! management action and exits. A `--server-mode` flag on `chat` disables
//! writing the resolved configuration back to disk, for use under a
//! supervisor that passes configuration via environment/flags every time.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ragcore_cli::{db, http_chat::HttpChatModel, repl};

#[derive(Parser)]
#[command(name = "ragcore", about = "Retrieval-augmented generation core: chat REPL and database tools")]
struct Cli {
    /// Path to the on-disk collection configuration file.
    #[arg(long, default_value = ragcore_cli::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Root directory holding this process's embedding/reranker model files.
    #[arg(long, default_value = "./models")]
    model_root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Starts the interactive search/DeepSearch REPL.
    Chat {
        /// Collection to search.
        collection: String,
        /// OpenAI-compatible base URL for the chat model, e.g.
        /// `http://localhost:11434/v1`. Omit to run retrieval-only (no
        /// answer synthesis).
        #[arg(long)]
        llm_url: Option<String>,
        /// Model name to request from `--llm-url`.
        #[arg(long, default_value = "default")]
        llm_model: String,
        /// API key for `--llm-url`, if required.
        #[arg(long)]
        llm_api_key: Option<String>,
        /// Number of DeepSearch evaluate/refine rounds per sub-query.
        #[arg(long, default_value_t = 2)]
        eval_iter: usize,
        /// Decomposes the question into sub-queries and runs DeepSearch
        /// instead of a single flat search. Requires `--llm-url`.
        #[arg(long)]
        deep: bool,
        /// Disables writing the resolved configuration back to disk.
        #[arg(long)]
        server_mode: bool,
    },
    /// Runs one collection-management action and exits.
    Db {
        #[command(subcommand)]
        action: db::DbCommand,
    },
}

fn main() -> Result<()> {
    ragcore_cli::init_tracing();
    let cli = Cli::parse();
    let config = ragcore_cli::load_config(&cli.config)?;
    let (manager, factory) = ragcore_cli::build_manager(&config.store, &cli.model_root)?;

    match cli.command {
        Command::Chat {
            collection,
            llm_url,
            llm_model,
            llm_api_key,
            eval_iter,
            deep,
            server_mode,
        } => {
            let chat: Option<Arc<dyn ragcore_core::chat::ChatModel>> = match llm_url {
                Some(url) => Some(Arc::new(HttpChatModel::connect(&url, &llm_model, llm_api_key)?)),
                None => None,
            };
            let options = repl::ChatOptions {
                collection,
                eval_iter,
                use_deep: deep && chat.is_some(),
                persist_config: !server_mode,
            };
            repl::run(&options, &manager, &factory, chat)?;
            if !server_mode {
                ragcore_cli::save_config(&cli.config, &config)?;
            }
        }
        Command::Db { action } => db::run(action, &manager, &factory)?,
    }
    Ok(())
}
