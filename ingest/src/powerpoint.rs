//! PowerPoint text extraction (pptx).
//!
//! Grounded on `original_source/tiny_chat/utils/file_processor.py`'s
//! `PowerPointProcessor`: one `--- スライド N ---` entry per slide, title
//! shape (if any) on a `タイトル: ` line, followed by every other shape's
//! text. `python-pptx` walks the OOXML part tree directly; this crate has
//! no OOXML-aware dependency in the teacher's stack, so it walks the same
//! tree by hand via `zip` + `quick-xml`, matching `p:sp`/`p:ph`/`a:t`
//! elements.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use zip::ZipArchive;

use crate::{Extraction, FileProcessor, IngestError};

/// Extracts text from `.pptx` bytes via direct slide-XML parsing.
#[derive(Clone, Copy, Debug, Default)]
pub struct PowerPointProcessor;

impl FileProcessor for PowerPointProcessor {
    fn extract_from_bytes(&self, bytes: &[u8], page_mode: bool) -> Result<Extraction, IngestError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| IngestError::Extraction {
            source: "<pptx>".to_string(),
            reason: e.to_string(),
        })?;

        let mut slide_names: Vec<String> = (0..archive.len())
            .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
            .filter(|name| {
                name.starts_with("ppt/slides/slide") && name.ends_with(".xml") && !name.contains("rels")
            })
            .collect();
        slide_names.sort_by_key(|name| slide_number(name));

        let mut slide_texts = Vec::with_capacity(slide_names.len());
        for (idx, name) in slide_names.iter().enumerate() {
            let mut xml = String::new();
            archive
                .by_name(name)
                .map_err(|e| IngestError::Extraction {
                    source: "<pptx>".to_string(),
                    reason: e.to_string(),
                })?
                .read_to_string(&mut xml)
                .map_err(|e| IngestError::Extraction {
                    source: "<pptx>".to_string(),
                    reason: e.to_string(),
                })?;

            let (title, body) = parse_slide(&xml)?;
            let mut text = format!("--- スライド {} ---\n", idx + 1);
            if let Some(title) = title {
                text.push_str(&format!("タイトル: {title}\n"));
            }
            for shape_text in body {
                if !shape_text.trim().is_empty() {
                    text.push_str(&shape_text);
                    text.push('\n');
                }
            }
            text.push('\n');
            slide_texts.push(text);
        }

        if page_mode {
            Ok(Extraction::paged(slide_texts))
        } else {
            let joined = slide_texts
                .iter()
                .map(|t| format!("\n{t}"))
                .collect::<Vec<_>>()
                .join("");
            Ok(Extraction {
                pages: vec![joined],
                unit_count: slide_names.len(),
            })
        }
    }
}

fn slide_number(name: &str) -> usize {
    name.trim_start_matches("ppt/slides/slide")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(0)
}

/// Walks one slide's XML, returning `(title, other_shape_texts)`.
fn parse_slide(xml: &str) -> Result<(Option<String>, Vec<String>), IngestError> {
    let mut reader = Reader::from_str(xml);

    let mut title: Option<String> = None;
    let mut shapes: Vec<String> = Vec::new();

    let mut in_shape = false;
    let mut shape_is_title = false;
    let mut shape_buffer = String::new();
    let mut in_text = false;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                let tag = name.as_ref();
                match tag {
                    b"sp" => {
                        in_shape = true;
                        shape_is_title = false;
                        shape_buffer.clear();
                    }
                    b"ph" if in_shape => {
                        if let Some(attr) = e.attributes().flatten().find(|a| a.key.as_ref() == b"type") {
                            let value = attr.value;
                            if value.as_ref() == b"title" || value.as_ref() == b"ctrTitle" {
                                shape_is_title = true;
                            }
                        }
                    }
                    b"t" => in_text = true,
                    _ => {}
                }
            }
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| IngestError::Extraction {
                        source: "<pptx>".to_string(),
                        reason: err.to_string(),
                    })?
                    .into_owned();
                shape_buffer.push_str(&text);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"t" => in_text = false,
                    b"sp" => {
                        if in_shape {
                            if shape_is_title {
                                title = Some(std::mem::take(&mut shape_buffer));
                            } else if !shape_buffer.trim().is_empty() {
                                shapes.push(std::mem::take(&mut shape_buffer));
                            }
                        }
                        in_shape = false;
                        shape_is_title = false;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(IngestError::Extraction {
                    source: "<pptx>".to_string(),
                    reason: err.to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok((title, shapes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = PowerPointProcessor
            .extract_from_bytes(b"not a pptx", true)
            .unwrap_err();
        assert!(matches!(err, IngestError::Extraction { .. }));
    }

    #[test]
    fn parse_slide_extracts_title_and_body() {
        let xml = r#"<p:sld xmlns:p="ns" xmlns:a="ns2">
            <p:cSld><p:spTree>
                <p:sp><p:nvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
                    <p:txBody><a:p><a:r><a:t>Slide Title</a:t></a:r></a:p></p:txBody>
                </p:sp>
                <p:sp><p:nvSpPr><p:nvPr/></p:nvSpPr>
                    <p:txBody><a:p><a:r><a:t>Body text</a:t></a:r></a:p></p:txBody>
                </p:sp>
            </p:spTree></p:cSld>
        </p:sld>"#;
        let (title, body) = parse_slide(xml).unwrap();
        assert_eq!(title.as_deref(), Some("Slide Title"));
        assert_eq!(body, vec!["Body text".to_string()]);
    }
}
