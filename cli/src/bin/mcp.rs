//! `ragcore-mcp`: the MCP server binary.
//!
//! `--mode local` serves over stdio, for editors/CLI clients that spawn this
//! process as a child. `--mode remote` serves the streamable-HTTP transport
//! on `--host`/`--port`, for MCP clients that connect over the network.
//! Grounded on `original_source/tiny_chat/mcp/search_mcp.py::parse_args`'s
//! own `local`/`remote` mode flag.

use std::net::SocketAddr;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use ragcore_adapters::{AppState, RagMcpServer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Stdio transport.
    Local,
    /// Streamable-HTTP transport.
    Remote,
}

#[derive(Parser)]
#[command(name = "ragcore-mcp", about = "MCP server exposing ragcore collections as search tools")]
struct Args {
    /// Path to the on-disk collection configuration file.
    #[arg(long, default_value = ragcore_cli::config::DEFAULT_CONFIG_PATH)]
    config: std::path::PathBuf,
    /// Root directory holding this process's embedding/reranker model files.
    #[arg(long, default_value = "./models")]
    model_root: std::path::PathBuf,
    /// Transport to serve.
    #[arg(long, value_enum, default_value_t = Mode::Local)]
    mode: Mode,
    /// Interface to bind in `--mode remote`.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind in `--mode remote`.
    #[arg(long, default_value_t = 8001)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    ragcore_cli::init_tracing();
    let args = Args::parse();
    let config = ragcore_cli::load_config(&args.config)?;
    let (manager, factory) = ragcore_cli::build_manager(&config.store, &args.model_root)?;
    let state = AppState::new(manager, factory, None);
    let server = RagMcpServer::new(state);

    match args.mode {
        Mode::Local => {
            tracing::info!("ragcore-mcp serving over stdio");
            ragcore_adapters::mcp::serve_stdio(server).await?;
        }
        Mode::Remote => {
            let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
            tracing::info!(%addr, "ragcore-mcp listening");
            ragcore_adapters::mcp::serve_http(server, addr).await?;
        }
    }
    Ok(())
}
