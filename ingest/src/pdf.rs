//! PDF text extraction.
//!
//! Grounded on `original_source/tiny_chat/utils/file_processor.py`'s
//! `PDFProcessor` for the per-page `"--- ページ N ---"` framing, and on the
//! teacher's own `pdf_process/src/parser.rs` for the `lopdf` extraction
//! calls (`Document::load_mem`, `get_pages`, `extract_text`).

use lopdf::Document;

use crate::{Extraction, FileProcessor, IngestError};

/// Extracts text from PDF bytes via `lopdf`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfProcessor;

impl FileProcessor for PdfProcessor {
    fn extract_from_bytes(&self, bytes: &[u8], page_mode: bool) -> Result<Extraction, IngestError> {
        let doc = Document::load_mem(bytes).map_err(|e| IngestError::Extraction {
            source: "<pdf>".to_string(),
            reason: e.to_string(),
        })?;

        let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        page_numbers.sort_unstable();

        let page_texts: Vec<String> = page_numbers
            .iter()
            .enumerate()
            .map(|(idx, &page_number)| {
                let raw = doc.extract_text(&[page_number]).unwrap_or_default();
                format!("--- ページ {} ---\n{raw}", idx + 1)
            })
            .collect();

        if page_mode {
            Ok(Extraction::paged(page_texts))
        } else {
            let joined = page_texts
                .iter()
                .map(|p| format!("\n{p}"))
                .collect::<Vec<_>>()
                .join("");
            Ok(Extraction {
                pages: vec![joined],
                unit_count: page_numbers.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            lopdf::Object::Dictionary(lopdf::dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn paged_mode_yields_one_entry_per_page() {
        let extraction = PdfProcessor.extract_from_bytes(&minimal_pdf(), true).unwrap();
        assert_eq!(extraction.unit_count, 1);
        assert_eq!(extraction.pages.len(), 1);
        assert!(extraction.pages[0].starts_with("--- ページ 1 ---"));
    }

    #[test]
    fn flat_mode_yields_single_joined_string() {
        let extraction = PdfProcessor.extract_from_bytes(&minimal_pdf(), false).unwrap();
        assert_eq!(extraction.pages.len(), 1);
        assert_eq!(extraction.unit_count, 1);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = PdfProcessor.extract_from_bytes(b"not a pdf", true).unwrap_err();
        assert!(matches!(err, IngestError::Extraction { .. }));
    }
}
