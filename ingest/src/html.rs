//! HTML text extraction.
//!
//! Grounded on `original_source/tiny_chat/utils/file_processor.py`'s
//! `HTMLProcessor`: strip `script`/`style`/`footer`/`nav` subtrees, collapse
//! runs of whitespace line by line, and report the page `<title>` in the
//! returned message.

use ego_tree::NodeRef;
use scraper::{Html, Node, Selector};

use crate::decode::decode_cascade;
use crate::{Extraction, FileProcessor, IngestError};

const STRIPPED_TAGS: [&str; 4] = ["script", "style", "footer", "nav"];

/// Extracts visible text from HTML bytes via `scraper`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlProcessor;

impl FileProcessor for HtmlProcessor {
    fn extract_from_bytes(&self, bytes: &[u8], _page_mode: bool) -> Result<Extraction, IngestError> {
        let html_text = decode_cascade(bytes, "<html>")?;
        let document = Html::parse_document(&html_text);

        let mut raw = String::new();
        collect_text(document.tree.root(), &mut raw);

        let cleaned: String = raw
            .lines()
            .map(str::trim)
            .flat_map(|line| line.split("  "))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Extraction::flat(cleaned))
    }
}

/// Returns the `<title>` text, or `"Webページ"` if the document has none,
/// matching the Python original's fallback.
#[must_use]
pub fn page_title(html_text: &str) -> String {
    let document = Html::parse_document(html_text);
    let selector = Selector::parse("title").expect("static selector");
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Webページ".to_string())
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(text);
            out.push('\n');
        }
        Node::Element(el) => {
            if STRIPPED_TAGS.contains(&el.name()) {
                return;
            }
            for child in node.children() {
                collect_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_style_content() {
        let html = "<html><head><style>.x{}</style></head><body>\
            <script>var x=1;</script><p>hello world</p></body></html>";
        let extraction = HtmlProcessor.extract_from_bytes(html.as_bytes(), false).unwrap();
        assert_eq!(extraction.pages, vec!["hello world".to_string()]);
    }

    #[test]
    fn missing_title_falls_back_to_default() {
        assert_eq!(page_title("<html><body>no title</body></html>"), "Webページ");
    }

    #[test]
    fn present_title_is_returned() {
        assert_eq!(
            page_title("<html><head><title>My Page</title></head></html>"),
            "My Page"
        );
    }
}
