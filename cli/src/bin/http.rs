//! `ragcore-http`: the HTTP adapter service binary.
//!
//! Serves the OpenAI-compatible proxy and `/retrieve`+`/create` REST surface
//! on the primary mount, and the editor-facing context-provider `/retrieve`
//! variant under `/context` (it shares a route path with the REST surface's
//! own `/retrieve`, so it cannot be merged onto the same mount).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ragcore_adapters::AppState;

#[derive(Parser)]
#[command(name = "ragcore-http", about = "OpenAI-compatible proxy and REST retrieval surface over the ragcore retrieval core")]
struct Args {
    /// Path to the on-disk collection configuration file.
    #[arg(long, default_value = ragcore_cli::config::DEFAULT_CONFIG_PATH)]
    config: std::path::PathBuf,
    /// Root directory holding this process's embedding/reranker model files.
    #[arg(long, default_value = "./models")]
    model_root: std::path::PathBuf,
    /// Interface to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind.
    #[arg(long, default_value_t = 8000)]
    port: u16,
    /// OpenAI-compatible base URL for the upstream chat model this process
    /// proxies `/v1/chat/completions` to. Omitted disables that route.
    #[arg(long)]
    llm_url: Option<String>,
    /// Model name to request from `--llm-url`.
    #[arg(long, default_value = "default")]
    llm_model: String,
    /// API key for `--llm-url`, if required.
    #[arg(long)]
    llm_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    ragcore_cli::init_tracing();
    let args = Args::parse();
    let config = ragcore_cli::load_config(&args.config)?;
    let (manager, factory) = ragcore_cli::build_manager(&config.store, &args.model_root)?;

    let chat: Option<Arc<dyn ragcore_core::chat::ChatModel>> = match &args.llm_url {
        Some(url) => Some(Arc::new(ragcore_cli::http_chat::HttpChatModel::connect(
            url,
            &args.llm_model,
            args.llm_api_key.clone(),
        )?)),
        None => None,
    };
    let state = AppState::new(manager, factory, chat);

    let app = axum::Router::new()
        .merge(ragcore_adapters::http_router(state.clone()))
        .nest("/context", ragcore_adapters::context_provider::router(state));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    tracing::info!(%addr, "ragcore-http listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
