//! Plain-text extraction (txt/csv/json/md).
//!
//! Grounded on `original_source/tiny_chat/utils/file_processor.py`'s
//! `TextFileProcessor`: the charset cascade in [`crate::decode`], flattened
//! to a single page (`spec.md` §3 — text formats have no native page
//! concept).

use crate::decode::decode_cascade;
use crate::{Extraction, FileProcessor, IngestError};

/// Extracts text from plain-text bytes via the UTF-8/Shift-JIS/CP932 cascade.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextProcessor;

impl FileProcessor for TextProcessor {
    fn extract_from_bytes(&self, bytes: &[u8], _page_mode: bool) -> Result<Extraction, IngestError> {
        let text = decode_cascade(bytes, "<text>")?;
        Ok(Extraction::flat(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_utf8_text_as_single_page() {
        let extraction = TextProcessor
            .extract_from_bytes("hello".as_bytes(), true)
            .unwrap();
        assert_eq!(extraction.unit_count, 1);
        assert_eq!(extraction.pages, vec!["hello".to_string()]);
    }

    #[test]
    fn undecodable_bytes_propagate_decode_error() {
        let err = TextProcessor
            .extract_from_bytes(&[0xFF, 0xFE, 0x00, 0xFF], true)
            .unwrap_err();
        assert!(matches!(err, IngestError::Decode { .. }));
    }
}
