//! Per-format document extraction, URI ingestion, and the delete-then-insert
//! indexing policy.
//!
//! Grounded on `original_source/tiny_chat/utils/file_processor.py`: one
//! processor per input family, each normalizing its bytes into
//! page-addressable text before the [`pipeline`] hands the pages to
//! [`ragcore_store::VectorStoreManager::add_documents`].
//!
//! File processing errors never crash the pipeline (`spec.md` §4.7/§7):
//! every processor returns a [`Result`](error::IngestError), and
//! [`pipeline::ingest_batch`] collects per-file errors alongside successes
//! rather than aborting.

pub mod decode;
pub mod error;
pub mod html;
pub mod pdf;
pub mod pipeline;
pub mod powerpoint;
pub mod spreadsheet;
pub mod text;
pub mod uri;
pub mod word;

pub use error::IngestError;
pub use pipeline::{ingest_batch, IngestOutcome};

/// A page-addressable extraction result.
///
/// In page mode (`page_mode: true`), `pages` holds one string per page,
/// sheet, slide, or paragraph bucket, in document order. In flat mode, a
/// single-element `pages` holds the whole concatenated text. Text-only
/// formats always degrade to a single page (`spec.md` §3).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted text, one entry per addressable unit.
    pub pages: Vec<String>,
    /// Number of pages/sheets/slides/paragraph-buckets extracted.
    pub unit_count: usize,
}

impl Extraction {
    /// Wraps a single flat string as a one-page extraction.
    #[must_use]
    pub fn flat(text: String) -> Self {
        Self {
            unit_count: 1,
            pages: vec![text],
        }
    }

    /// Wraps an ordered sequence of per-page strings.
    #[must_use]
    pub fn paged(pages: Vec<String>) -> Self {
        let unit_count = pages.len();
        Self { pages, unit_count }
    }
}

/// One input family's extraction contract.
///
/// `extract_from_bytes` never panics on malformed input; it returns
/// [`IngestError`] instead, which the pipeline surfaces per-file without
/// aborting the batch.
pub trait FileProcessor: Send + Sync {
    /// Extracts page-addressable text from raw file bytes.
    ///
    /// # Errors
    /// Returns [`IngestError::Extraction`] if the bytes cannot be parsed as
    /// this format, or [`IngestError::Decode`] if text decoding fails.
    fn extract_from_bytes(&self, bytes: &[u8], page_mode: bool) -> Result<Extraction, IngestError>;
}

/// Resolves a file extension (without the leading dot, case-insensitive) to
/// its processor, mirroring `FileProcessorFactory.get_processor`.
#[must_use]
pub fn processor_for_extension(extension: &str) -> Option<Box<dyn FileProcessor>> {
    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "pdf" => Some(Box::new(pdf::PdfProcessor)),
        "xlsx" | "xls" => Some(Box::new(spreadsheet::SpreadsheetProcessor)),
        "docx" => Some(Box::new(word::WordProcessor)),
        "pptx" => Some(Box::new(powerpoint::PowerPointProcessor)),
        "txt" | "csv" | "json" | "md" => Some(Box::new(text::TextProcessor)),
        "html" | "htm" => Some(Box::new(html::HtmlProcessor)),
        _ => None,
    }
}

/// Resolves an HTTP `Content-Type` header value to its processor, mirroring
/// `URIProcessor.process_uri`'s content-type branch.
#[must_use]
pub fn processor_for_content_type(content_type: &str) -> Option<Box<dyn FileProcessor>> {
    let ct = content_type.to_lowercase();
    if ct.contains("application/pdf") {
        Some(Box::new(pdf::PdfProcessor))
    } else if ct.contains("spreadsheetml.sheet") || ct.contains("application/vnd.ms-excel") {
        Some(Box::new(spreadsheet::SpreadsheetProcessor))
    } else if ct.contains("wordprocessingml.document") || ct.contains("application/msword") {
        Some(Box::new(word::WordProcessor))
    } else if ct.contains("presentationml.presentation") || ct.contains("application/vnd.ms-powerpoint")
    {
        Some(Box::new(powerpoint::PowerPointProcessor))
    } else if ct.contains("text/html") {
        Some(Box::new(html::HtmlProcessor))
    } else if ct.contains("text/") {
        Some(Box::new(text::TextProcessor))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        assert!(processor_for_extension("PDF").is_some());
        assert!(processor_for_extension(".PdF").is_some());
    }

    #[test]
    fn unknown_extension_has_no_processor() {
        assert!(processor_for_extension("exe").is_none());
    }

    #[test]
    fn content_type_dispatch_matches_known_families() {
        assert!(processor_for_content_type("application/pdf").is_some());
        assert!(processor_for_content_type(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet; charset=utf-8"
        )
        .is_some());
        assert!(processor_for_content_type("text/plain").is_some());
        assert!(processor_for_content_type("application/octet-stream").is_none());
    }
}
