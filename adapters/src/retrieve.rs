//! The `{source, content, page}` shape every retrieval surface in this
//! crate returns, per `spec.md` §6's `/retrieve` contract.

use ragcore_core::model::SearchHit;
use serde::Serialize;

/// One retrieved chunk, as returned by `/retrieve`, the context-provider
/// variant, and the MCP `search-<collection>` tools.
#[derive(Clone, Debug, Serialize)]
pub struct RetrievedChunk {
    /// Source identifier of the chunk's parent document.
    pub source: String,
    /// Chunk text.
    pub content: String,
    /// 1-based page ordinal.
    pub page: usize,
}

impl From<&SearchHit> for RetrievedChunk {
    fn from(hit: &SearchHit) -> Self {
        Self {
            source: hit.source().to_string(),
            content: hit.text().to_string(),
            page: hit.page(),
        }
    }
}
