//! Word document text extraction (docx).
//!
//! Grounded on `original_source/tiny_chat/utils/file_processor.py`'s
//! `WordProcessor`: one `--- 段落 N ---` entry per non-blank paragraph,
//! blank paragraphs skipped entirely and excluded from the count. Table
//! rows are flattened to `|`-joined cell text, a small generalization this
//! crate's `docx-rs`-based reader makes possible over the Python original's
//! paragraph-only walk.

use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild};

use crate::{Extraction, FileProcessor, IngestError};

/// Extracts text from `.docx` bytes via `docx-rs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordProcessor;

impl FileProcessor for WordProcessor {
    fn extract_from_bytes(&self, bytes: &[u8], page_mode: bool) -> Result<Extraction, IngestError> {
        let docx = read_docx(bytes).map_err(|e| IngestError::Extraction {
            source: "<docx>".to_string(),
            reason: format!("{e:?}"),
        })?;

        let units: Vec<String> = docx
            .document
            .children
            .iter()
            .filter_map(document_child_text)
            .filter(|text| !text.trim().is_empty())
            .collect();

        if page_mode {
            let numbered: Vec<String> = units
                .iter()
                .enumerate()
                .map(|(i, text)| format!("--- 段落 {} ---\n{text}\n", i + 1))
                .collect();
            Ok(Extraction::paged(numbered))
        } else {
            let joined = units
                .iter()
                .map(|t| format!("{t}\n"))
                .collect::<Vec<_>>()
                .join("");
            Ok(Extraction {
                pages: vec![joined],
                unit_count: units.len(),
            })
        }
    }
}

fn document_child_text(child: &DocumentChild) -> Option<String> {
    match child {
        DocumentChild::Paragraph(p) => {
            let text = paragraph_text(p.children.iter());
            (!text.is_empty()).then_some(text)
        }
        DocumentChild::Table(t) => {
            let text = table_text(t.rows.iter());
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

fn paragraph_text<'a>(children: impl Iterator<Item = &'a ParagraphChild>) -> String {
    let mut out = String::new();
    for child in children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let RunChild::Text(text) = rc {
                    out.push_str(&text.text);
                }
            }
        }
    }
    out
}

fn table_text<'a>(rows: impl Iterator<Item = &'a TableChild>) -> String {
    let mut lines = Vec::new();
    for row in rows {
        let TableChild::TableRow(row) = row else {
            continue;
        };
        let mut cells = Vec::new();
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            let mut cell_text = String::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => {
                        cell_text.push_str(&paragraph_text(p.children.iter()));
                    }
                    TableCellContent::Table(t) => {
                        cell_text.push_str(&table_text(t.rows.iter()));
                    }
                    #[allow(unreachable_patterns)]
                    _ => {}
                }
            }
            cells.push(cell_text);
        }
        lines.push(cells.join("|"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = WordProcessor.extract_from_bytes(b"not a docx", true).unwrap_err();
        assert!(matches!(err, IngestError::Extraction { .. }));
    }
}
