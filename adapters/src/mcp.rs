//! Dynamic MCP surface: one `search-<collection>` tool per MCP-visible
//! collection, plus a `collections-list` tool.
//!
//! Grounded on `original_source/tiny_chat/mcp/search_mcp.py`: tools are not
//! a fixed compile-time set (unlike `rmcp`'s usual `#[tool]`-macro idiom,
//! which the teacher's own `mcp/src/server/server.rs` doesn't use either,
//! since it predates tool registration entirely); `list_tools` is
//! recomputed from the catalog on every call so newly created collections
//! appear without a server restart. `show_in_mcp = false` hides a
//! collection's tool.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use serde::Deserialize;
use serde_json::Map;

use crate::state::AppState;

/// Tool name prefix; the collection name is appended verbatim.
pub const SEARCH_TOOL_PREFIX: &str = "search-";

/// Name of the tool enumerating every MCP-visible collection.
pub const COLLECTIONS_LIST_TOOL: &str = "collections-list";

/// The `{query, top_k?, score_threshold?}` arguments every `search-<name>`
/// tool accepts.
#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    top_k: Option<usize>,
    score_threshold: Option<f32>,
}

/// MCP server exposing the retrieval core's collections as search tools.
#[derive(Clone)]
pub struct RagMcpServer {
    state: AppState,
}

impl RagMcpServer {
    /// Wraps `state` as an MCP server.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn search_tool_for(entry: &ragcore_store::Collection) -> Tool {
        let mut properties = Map::new();
        properties.insert(
            "query".to_string(),
            serde_json::json!({ "type": "string", "description": "Natural-language search query" }),
        );
        properties.insert(
            "top_k".to_string(),
            serde_json::json!({ "type": "integer", "description": "Maximum number of hits to return" }),
        );
        properties.insert(
            "score_threshold".to_string(),
            serde_json::json!({ "type": "number", "description": "Minimum score a hit must meet" }),
        );
        let input_schema = serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": ["query"],
        })
        .as_object()
        .cloned()
        .expect("literal object");
        Tool {
            name: Cow::Owned(format!("{SEARCH_TOOL_PREFIX}{}", entry.name)),
            description: Some(Cow::Owned(entry.description.clone())),
            input_schema: Arc::new(input_schema),
            annotations: None,
            title: None,
            icons: None,
            output_schema: None,
        }
    }

    fn collections_list_tool() -> Tool {
        Tool {
            name: Cow::Borrowed(COLLECTIONS_LIST_TOOL),
            description: Some(Cow::Borrowed("Enumerate collections visible over this MCP surface")),
            input_schema: Arc::new(
                serde_json::json!({ "type": "object", "properties": {} })
                    .as_object()
                    .cloned()
                    .expect("literal object"),
            ),
            annotations: None,
            title: None,
            icons: None,
            output_schema: None,
        }
    }
}

impl ServerHandler for RagMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "ragcore".to_string(),
                title: Some("ragcore retrieval core".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Each search-<collection> tool retrieves chunks from one collection; \
                 collections-list enumerates the collections available."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let collections = self
            .state
            .visible_collections(true)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        let mut tools: Vec<Tool> = collections.iter().map(Self::search_tool_for).collect();
        tools.push(Self::collections_list_tool());
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        if request.name.as_ref() == COLLECTIONS_LIST_TOOL {
            let collections = self
                .state
                .visible_collections(true)
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
            let summary = collections
                .iter()
                .map(|c| format!("{}: {}", c.name, c.description))
                .collect::<Vec<_>>()
                .join("\n");
            return Ok(CallToolResult::success(vec![Content::text(summary)]));
        }

        let Some(collection) = request.name.strip_prefix(SEARCH_TOOL_PREFIX) else {
            return Err(ErrorData::invalid_params(
                format!("unknown tool '{}'", request.name),
                None,
            ));
        };

        let args_value = serde_json::Value::Object(request.arguments.unwrap_or_default());
        let args: SearchArgs = serde_json::from_value(args_value)
            .map_err(|e| ErrorData::invalid_params(format!("malformed arguments: {e}"), None))?;

        let hits = self
            .state
            .retrieve(collection, &args.query, args.top_k, args.score_threshold)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

        let text = if hits.is_empty() {
            "No results.".to_string()
        } else {
            hits.iter()
                .map(|h| format!("[{} page:{}]\n{}", h.source, h.page, h.content))
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

/// Runs `server` over stdio until the peer disconnects. Grounded on
/// `original_source/tiny_chat/mcp/search_mcp.py::parse_args`'s `local` mode
/// (stdio transport, for editors/CLI clients that spawn the server as a
/// child process).
///
/// # Errors
/// Returns [`AdapterError::Core`] if the transport fails to start or the
/// service loop errors.
pub async fn serve_stdio(server: RagMcpServer) -> Result<(), AdapterError> {
    use rmcp::ServiceExt;

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| AdapterError::BadRequest(format!("mcp stdio transport failed: {e}")))?;
    service
        .waiting()
        .await
        .map_err(|e| AdapterError::BadRequest(format!("mcp service loop failed: {e}")))?;
    Ok(())
}

/// Serves `server` over the streamable-HTTP (SSE-capable) transport on
/// `addr`. Grounded on the same `parse_args`'s `remote` mode.
///
/// # Errors
/// Returns [`AdapterError::BadRequest`] if the listener cannot bind or the
/// server loop errors.
pub async fn serve_http(server: RagMcpServer, addr: std::net::SocketAddr) -> Result<(), AdapterError> {
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    };

    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AdapterError::BadRequest(format!("failed to bind {addr}: {e}")))?;
    axum::serve(listener, router)
        .await
        .map_err(|e| AdapterError::BadRequest(format!("mcp http server failed: {e}")))?;
    Ok(())
}
