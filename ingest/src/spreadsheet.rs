//! Spreadsheet text extraction (xlsx/xls).
//!
//! Grounded on `original_source/tiny_chat/utils/file_processor.py`'s
//! `ExcelProcessor`: one `--- シート: <name> ---` header per sheet, rows
//! joined by spaces, cells stringified with blanks skipped.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use crate::{Extraction, FileProcessor, IngestError};

/// Extracts text from Excel workbook bytes via `calamine`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpreadsheetProcessor;

impl FileProcessor for SpreadsheetProcessor {
    fn extract_from_bytes(&self, bytes: &[u8], page_mode: bool) -> Result<Extraction, IngestError> {
        let mut workbook: Xlsx<_> =
            open_workbook_from_rs(Cursor::new(bytes)).map_err(|e| IngestError::Extraction {
                source: "<spreadsheet>".to_string(),
                reason: e.to_string(),
            })?;

        let sheet_names = workbook.sheet_names().to_vec();
        let mut sheet_texts = Vec::with_capacity(sheet_names.len());

        for name in &sheet_names {
            let range = workbook
                .worksheet_range(name)
                .map_err(|e| IngestError::Extraction {
                    source: "<spreadsheet>".to_string(),
                    reason: e.to_string(),
                })?;

            let mut sheet_text = format!("--- シート: {name} ---\n");
            for row in range.rows() {
                let row_values: Vec<String> = row
                    .iter()
                    .filter(|cell| !matches!(cell, Data::Empty))
                    .map(cell_to_string)
                    .collect();
                if !row_values.is_empty() {
                    sheet_text.push_str(&row_values.join(" "));
                    sheet_text.push('\n');
                }
            }
            sheet_texts.push(sheet_text);
        }

        if page_mode {
            Ok(Extraction::paged(sheet_texts))
        } else {
            let joined: String = sheet_texts
                .iter()
                .map(|t| format!("\n{t}\n"))
                .collect::<Vec<_>>()
                .join("");
            Ok(Extraction {
                pages: vec![joined],
                unit_count: sheet_names.len(),
            })
        }
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::String(s) => s.clone(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = SpreadsheetProcessor
            .extract_from_bytes(b"not an xlsx", true)
            .unwrap_err();
        assert!(matches!(err, IngestError::Extraction { .. }));
    }
}
