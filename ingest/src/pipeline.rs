//! Wires per-format extraction into the store's delete-then-insert indexing
//! policy.
//!
//! Grounded on `original_source/tiny_chat/utils/file_processor.py`'s
//! `process_file` (metadata shape: `source`, `file_type`, `page_count`) and
//! on `ragcore_store::VectorStoreManager::add_documents`, which already
//! implements "delete every record sharing this source, then insert the
//! fresh set" so a re-ingested file never leaves stale chunks behind.

use std::collections::BTreeMap;

use ragcore_core::error::{CoreError, Result};
use ragcore_core::model::Metadata;
use ragcore_strategy::RetrievalStrategy;
use uuid::Uuid;

use crate::{processor_for_extension, uri, Extraction, IngestError};

/// One file submitted for ingestion.
#[derive(Clone, Debug)]
pub struct FileIngestRequest {
    /// Stable identifier for this document (path or logical name), used as
    /// the dedup key for delete-then-insert.
    pub source: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
    /// File extension (without leading dot), used to pick a processor.
    pub extension: String,
}

/// Successful per-document ingestion result.
#[derive(Clone, Debug)]
pub struct IngestOutcome {
    /// The document's source identifier.
    pub source: String,
    /// Number of pages/sheets/slides/paragraph-buckets extracted.
    pub page_count: usize,
    /// Chunk id of each page's first chunk, in page order.
    pub chunk_ids: Vec<Uuid>,
}

/// Extracts and indexes a single file, replacing any prior chunks for the
/// same `source`.
///
/// # Errors
/// Returns [`CoreError::InputRejected`] if no processor is registered for
/// `request.extension`, or propagates extraction/decode/storage errors.
#[allow(clippy::too_many_arguments)]
pub fn ingest_file(
    manager: &ragcore_store::VectorStoreManager,
    request: &FileIngestRequest,
    collection: &str,
    strategy: &RetrievalStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<IngestOutcome> {
    let processor = processor_for_extension(&request.extension)
        .ok_or_else(|| IngestError::UnsupportedFormat(request.extension.clone()))?;
    let extraction = processor.extract_from_bytes(&request.bytes, true)?;
    index_extraction(
        manager,
        &request.source,
        &request.extension,
        extraction,
        collection,
        strategy,
        chunk_size,
        chunk_overlap,
    )
}

/// Fetches a remote URI and indexes its extracted text, replacing any prior
/// chunks for the same `uri`.
///
/// # Errors
/// Propagates [`IngestError`] fetch/decode/extraction failures (as
/// [`CoreError`]) or storage errors.
#[allow(clippy::too_many_arguments)]
pub fn ingest_uri(
    manager: &ragcore_store::VectorStoreManager,
    target_uri: &str,
    max_length: usize,
    collection: &str,
    strategy: &RetrievalStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<IngestOutcome> {
    let extraction = uri::ingest_uri(target_uri, max_length, true)?;
    index_extraction(
        manager,
        target_uri,
        "uri",
        extraction,
        collection,
        strategy,
        chunk_size,
        chunk_overlap,
    )
}

#[allow(clippy::too_many_arguments)]
fn index_extraction(
    manager: &ragcore_store::VectorStoreManager,
    source: &str,
    file_type: &str,
    extraction: Extraction,
    collection: &str,
    strategy: &RetrievalStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<IngestOutcome> {
    let page_count = extraction.unit_count;
    let mut texts = Vec::with_capacity(extraction.pages.len());
    let mut metadata = Vec::with_capacity(extraction.pages.len());

    for (idx, text) in extraction.pages.into_iter().enumerate() {
        let mut meta: Metadata = BTreeMap::new();
        meta.insert("source".to_string(), source.to_string());
        meta.insert("file_type".to_string(), file_type.to_string());
        meta.insert("page_count".to_string(), page_count.to_string());
        meta.insert("page".to_string(), (idx + 1).to_string());
        texts.push(text);
        metadata.push(meta);
    }

    let chunk_ids = manager.add_documents(&texts, &metadata, collection, strategy, chunk_size, chunk_overlap)?;

    Ok(IngestOutcome {
        source: source.to_string(),
        page_count,
        chunk_ids,
    })
}

/// Ingests every request, continuing past per-file failures rather than
/// aborting the batch (`spec.md` §4.7/§7).
#[allow(clippy::too_many_arguments)]
pub fn ingest_batch(
    manager: &ragcore_store::VectorStoreManager,
    requests: &[FileIngestRequest],
    collection: &str,
    strategy: &RetrievalStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<(String, std::result::Result<IngestOutcome, CoreError>)> {
    requests
        .iter()
        .map(|request| {
            let outcome = ingest_file(manager, request, collection, strategy, chunk_size, chunk_overlap);
            (request.source.clone(), outcome)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_store::config::{StoreConfig, MEMORY_PATH};
    use ragcore_store::VectorStoreManager;

    fn memory_manager() -> VectorStoreManager {
        VectorStoreManager::new(StoreConfig {
            file_path: Some(MEMORY_PATH.to_string()),
            server_url: None,
            api_key: None,
            selected_collection_name: None,
        })
        .unwrap()
    }

    #[test]
    fn unsupported_extension_is_rejected_before_touching_the_store() {
        let manager = memory_manager();
        manager
            .ensure_collection("docs", &RetrievalStrategy::Noop)
            .unwrap();
        let request = FileIngestRequest {
            source: "a.exe".to_string(),
            bytes: vec![1, 2, 3],
            extension: "exe".to_string(),
        };
        let err = ingest_file(&manager, &request, "docs", &RetrievalStrategy::Noop, 500, 50).unwrap_err();
        assert!(matches!(err, CoreError::InputRejected(_)));
    }

    #[test]
    fn ingesting_plain_text_produces_one_chunk_id_per_page() {
        let manager = memory_manager();
        manager
            .ensure_collection("docs", &RetrievalStrategy::Noop)
            .unwrap();
        let request = FileIngestRequest {
            source: "note.txt".to_string(),
            bytes: b"hello there".to_vec(),
            extension: "txt".to_string(),
        };
        let outcome =
            ingest_file(&manager, &request, "docs", &RetrievalStrategy::Noop, 500, 50).unwrap();
        assert_eq!(outcome.page_count, 1);
        assert_eq!(outcome.chunk_ids.len(), 1);
        assert_eq!(outcome.source, "note.txt");
    }

    #[test]
    fn reingesting_the_same_source_replaces_rather_than_duplicates() {
        let manager = memory_manager();
        manager
            .ensure_collection("docs", &RetrievalStrategy::Noop)
            .unwrap();
        let request = FileIngestRequest {
            source: "note.txt".to_string(),
            bytes: b"version one".to_vec(),
            extension: "txt".to_string(),
        };
        ingest_file(&manager, &request, "docs", &RetrievalStrategy::Noop, 500, 50).unwrap();
        let request_v2 = FileIngestRequest {
            bytes: b"version two".to_vec(),
            ..request
        };
        ingest_file(&manager, &request_v2, "docs", &RetrievalStrategy::Noop, 500, 50).unwrap();
        assert_eq!(manager.count_documents("docs").unwrap(), 1);
    }

    #[test]
    fn multi_page_document_keeps_one_chunk_per_page_without_id_collisions() {
        // Each page here is short enough to produce exactly one chunk
        // (chunk_index 0 on every page), which is precisely the shape that
        // collided before `Chunk::derive_id` took `page` into account.
        let manager = memory_manager();
        manager
            .ensure_collection("docs", &RetrievalStrategy::Noop)
            .unwrap();
        let extraction = Extraction::paged(vec![
            "page one text".to_string(),
            "page two text".to_string(),
            "page three text".to_string(),
        ]);
        let outcome = index_extraction(
            &manager,
            "report.pdf",
            "pdf",
            extraction,
            "docs",
            &RetrievalStrategy::Noop,
            500,
            50,
        )
        .unwrap();

        assert_eq!(outcome.page_count, 3);
        assert_eq!(outcome.chunk_ids.len(), 3);
        let unique: std::collections::HashSet<_> = outcome.chunk_ids.iter().collect();
        assert_eq!(unique.len(), 3, "each page's chunk id must be distinct");
        assert_eq!(manager.count_documents("docs").unwrap(), 3);
        assert_eq!(manager.get_sources("docs", None).unwrap(), vec!["report.pdf".to_string()]);
    }

    #[test]
    fn batch_ingest_keeps_going_past_a_failing_file() {
        let manager = memory_manager();
        manager
            .ensure_collection("docs", &RetrievalStrategy::Noop)
            .unwrap();
        let requests = vec![
            FileIngestRequest {
                source: "good.txt".to_string(),
                bytes: b"ok".to_vec(),
                extension: "txt".to_string(),
            },
            FileIngestRequest {
                source: "bad.exe".to_string(),
                bytes: vec![0, 1],
                extension: "exe".to_string(),
            },
        ];
        let results = ingest_batch(&manager, &requests, "docs", &RetrievalStrategy::Noop, 500, 50);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
    }
}
