//! Data model shared by ingestion, the store, and the planner.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key/value metadata attached to documents, pages, and chunks.
pub type Metadata = BTreeMap<String, String>;

/// One logical input: a file, a URI, or raw text.
///
/// Created by ingestion, never mutated; a document is replaced wholesale by
/// deleting every record sharing its `source` and inserting fresh ones.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier (path or URL) for this document.
    pub source: String,
    /// File extension or content-type family (`"pdf"`, `"xlsx"`, `"html"`, ...).
    pub file_type: String,
    /// Number of pages extracted.
    pub page_count: usize,
    /// Opaque origin metadata (file size, title, etc.).
    pub metadata: Metadata,
}

/// One addressable unit within a document: a PDF page, a spreadsheet sheet,
/// a slide, a paragraph bucket, or the whole file for flat formats.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page {
    /// 1-based ordinal within the document.
    pub ordinal: NonZeroUsize,
    /// Extracted text for this page.
    pub text: String,
}

/// The atomic indexed unit.
///
/// `id` is a namespaced-UUID hash of `source#page#chunk_index`, so
/// re-ingesting the same `(source, text, chunk_size, chunk_overlap)` always
/// produces the same chunk ids and indexing is idempotent. The page ordinal
/// is load-bearing: `chunk_index` alone is page-local (it resets to 0 at the
/// start of every page), so two pages of the same source would otherwise
/// collide on the same id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic chunk id.
    pub id: Uuid,
    /// Chunk text. `len(text) <= chunk_size` except via the splitter's fixed-stride fallback.
    pub text: String,
    /// Source identifier of the parent document.
    pub source: String,
    /// 1-based page ordinal this chunk was extracted from.
    pub page: usize,
    /// 0-based index of this chunk within its page.
    pub chunk_index: usize,
    /// Total number of chunks produced for this page.
    pub chunk_total: usize,
    /// Id of the parent document (constant across all of a document's chunks).
    pub parent_id: Uuid,
}

impl Chunk {
    /// Derives the deterministic id for chunk `chunk_index` of page `page` of
    /// `source`.
    ///
    /// Namespaced-UUID hash of `{source}#page_{page}#chunk_{chunk_index}`,
    /// mirroring the `uuid5(NAMESPACE_DNS, f"{id}_chunk_{i}")` convention this
    /// contract was distilled from, extended with the page ordinal so two
    /// pages of the same source never collide on the same page-local
    /// `chunk_index` (`spec.md` §3: the id hashes a document-wide ordinal,
    /// not the page-scoped `chunk_index` field).
    #[must_use]
    pub fn derive_id(source: &str, page: usize, chunk_index: usize) -> Uuid {
        Uuid::new_v5(
            &Uuid::NAMESPACE_DNS,
            format!("{source}#page_{page}#chunk_{chunk_index}").as_bytes(),
        )
    }

    /// Derives the stable parent id for a source, used as `parent_id` on every
    /// chunk of that source.
    #[must_use]
    pub fn derive_parent_id(source: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_DNS, source.as_bytes())
    }
}

/// One record as stored in the vector database: an id, the vector fields
/// produced by a strategy's write path, and its payload. Carries no opinion
/// about which fields are populated — that is determined by the owning
/// collection's [retrieval strategy](https://docs.rs/ragcore-strategy).
#[derive(Clone, Debug)]
pub struct VectorRecord {
    /// Point id (deterministic chunk id, or the catalog entry's collection-derived id).
    pub id: Uuid,
    /// Named vector fields to upsert (`"sparse"`, `"dense"`, or strategy-specific names).
    pub vectors: BTreeMap<String, VectorField>,
    /// Stored payload. Always carries at least `text`, `source`, `page`.
    pub payload: Metadata,
}

/// One named vector field's value, as written to the store.
#[derive(Clone, Debug)]
pub enum VectorField {
    /// A sparse lexical vector.
    Sparse(crate::embedding::SparseVector),
    /// A dense semantic vector.
    Dense(Vec<f32>),
}

/// One retrieved hit: an id, a score, and its stored payload.
///
/// Scores are comparable only within one query invocation, never across
/// strategies or across calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchHit {
    /// Id of the matching point in the store.
    pub id: Uuid,
    /// Similarity (or fused, or rerank) score. Higher is better.
    pub score: f32,
    /// Stored payload, always containing at least `text`, `source`, `page`.
    pub payload: Metadata,
}

impl SearchHit {
    /// Convenience accessor for the `text` payload field.
    #[must_use]
    pub fn text(&self) -> &str {
        self.payload.get("text").map_or("", String::as_str)
    }

    /// Convenience accessor for the `source` payload field.
    #[must_use]
    pub fn source(&self) -> &str {
        self.payload.get("source").map_or("", String::as_str)
    }

    /// Convenience accessor for the `page` payload field, defaulting to 0 if absent/unparseable.
    #[must_use]
    pub fn page(&self) -> usize {
        self.payload
            .get("page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(0)
    }

    /// The `(source, page)` dedup/blacklist key used by the planner.
    #[must_use]
    pub fn source_page_key(&self) -> (String, usize) {
        (self.source().to_string(), self.page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_deterministic() {
        let a = Chunk::derive_id("doc.pdf", 1, 2);
        let b = Chunk::derive_id("doc.pdf", 1, 2);
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_id_differs_by_index() {
        let a = Chunk::derive_id("doc.pdf", 1, 0);
        let b = Chunk::derive_id("doc.pdf", 1, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn chunk_id_differs_by_source() {
        let a = Chunk::derive_id("doc-a.pdf", 1, 0);
        let b = Chunk::derive_id("doc-b.pdf", 1, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn chunk_id_differs_by_page() {
        let a = Chunk::derive_id("doc.pdf", 1, 0);
        let b = Chunk::derive_id("doc.pdf", 2, 0);
        assert_ne!(a, b, "page 1 chunk 0 must not collide with page 2 chunk 0");
    }

    #[test]
    fn search_hit_accessors_default_gracefully() {
        let hit = SearchHit {
            id: Uuid::nil(),
            score: 1.0,
            payload: Metadata::new(),
        };
        assert_eq!(hit.text(), "");
        assert_eq!(hit.source(), "");
        assert_eq!(hit.page(), 0);
    }
}
