//! URI ingestion: fetch a remote document and extract text from it.
//!
//! Grounded on `original_source/tiny_chat/utils/file_processor.py`'s
//! `URIProcessor.process_uri`: validate the URI, fetch it, dispatch on
//! `Content-Type`, then truncate each resulting page to a fair share of
//! `max_length`.

use reqwest::blocking::Client;
use reqwest::Url;

use crate::{processor_for_content_type, Extraction, IngestError};

/// Default per-request character budget, matching the Python original's
/// `max_length=4000` default.
pub const DEFAULT_MAX_LENGTH: usize = 4000;

/// Fetches `uri` and extracts text from its body, truncating the result to
/// fit within `max_length` characters (split evenly across pages in page
/// mode).
///
/// # Errors
/// Returns [`IngestError::InvalidUri`] if the URI has no scheme or host,
/// [`IngestError::Fetch`] if the request fails or returns a non-200 status,
/// or [`IngestError::UnsupportedFormat`] if the response's content type has
/// no registered processor.
pub fn ingest_uri(uri: &str, max_length: usize, page_mode: bool) -> Result<Extraction, IngestError> {
    let parsed = Url::parse(uri).map_err(|_| IngestError::InvalidUri(uri.to_string()))?;
    if parsed.host_str().is_none() || !matches!(parsed.scheme(), "http" | "https") {
        return Err(IngestError::InvalidUri(uri.to_string()));
    }

    let client = Client::new();
    let response = client.get(parsed).send().map_err(|e| IngestError::Fetch {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;

    if !response.status().is_success() {
        return Err(IngestError::Fetch {
            uri: uri.to_string(),
            reason: format!("unexpected status code: {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let body = response.bytes().map_err(|e| IngestError::Fetch {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;

    let processor = processor_for_content_type(&content_type)
        .ok_or_else(|| IngestError::UnsupportedFormat(content_type.clone()))?;

    let extraction = processor.extract_from_bytes(&body, page_mode)?;
    Ok(truncate(extraction, max_length))
}

fn truncate(extraction: Extraction, max_length: usize) -> Extraction {
    if extraction.pages.len() > 1 {
        let per_page = (max_length / extraction.pages.len()).max(1);
        let pages = extraction
            .pages
            .into_iter()
            .map(|p| char_truncate(&p, per_page))
            .collect();
        Extraction {
            pages,
            unit_count: extraction.unit_count,
        }
    } else {
        let pages = extraction
            .pages
            .into_iter()
            .map(|p| char_truncate(&p, max_length))
            .collect();
        Extraction {
            pages,
            unit_count: extraction.unit_count,
        }
    }
}

fn char_truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_uri_without_scheme() {
        let err = ingest_uri("not-a-uri", DEFAULT_MAX_LENGTH, false).unwrap_err();
        assert!(matches!(err, IngestError::InvalidUri(_)));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = ingest_uri("ftp://example.com/file", DEFAULT_MAX_LENGTH, false).unwrap_err();
        assert!(matches!(err, IngestError::InvalidUri(_)));
    }

    #[test]
    fn truncate_splits_budget_across_pages() {
        let extraction = Extraction::paged(vec!["a".repeat(100), "b".repeat(100)]);
        let truncated = truncate(extraction, 20);
        assert_eq!(truncated.pages[0].chars().count(), 10);
        assert_eq!(truncated.pages[1].chars().count(), 10);
    }

    #[test]
    fn truncate_caps_flat_text() {
        let extraction = Extraction::flat("a".repeat(50));
        let truncated = truncate(extraction, 10);
        assert_eq!(truncated.pages[0].chars().count(), 10);
    }
}
