//! Sparse-path tokenization.
//!
//! Grounded on `original_source/tiny_chat/database/embeddings/bm25_embedding.py::_tokenize`:
//! segment into morphemes, drop auxiliary-symbol tokens, drop stopwords,
//! emit the normalized (dictionary) form. Tokenization never raises; on any
//! failure it yields an empty token list.

use lindera::dictionary::{DictionaryKind, load_dictionary_from_kind};
use lindera::mode::Mode;
use lindera::segmenter::Segmenter;
use lindera::tokenizer::Tokenizer as LinderaTokenizer;
use rust_stemmers::{Algorithm, Stemmer};

/// Converts raw text into a sequence of index terms for sparse embedding.
///
/// Implementations must never propagate an error for malformed input or a
/// dictionary hiccup; they return an empty `Vec` instead.
pub trait SparseTokenizer: Send + Sync {
    /// Tokenizes `text` into normalized index terms.
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Part-of-speech tag dropped from Japanese morpheme output: auxiliary
/// symbols (punctuation-like tokens the dictionary classifies separately
/// from ordinary punctuation).
const AUXILIARY_SYMBOL_POS: &str = "補助記号";

/// Japanese morphological tokenizer: segment, drop auxiliary symbols, drop
/// stopwords, emit normalized forms.
pub struct JapaneseTokenizer {
    tokenizer: LinderaTokenizer,
    stopwords: std::collections::HashSet<String>,
}

impl JapaneseTokenizer {
    /// Builds a tokenizer backed by the bundled IPADIC dictionary.
    ///
    /// # Errors
    /// Returns an error if the bundled dictionary fails to load; this should
    /// not happen in practice since the dictionary is compiled in.
    pub fn new() -> Result<Self, lindera::LinderaError> {
        let dictionary = load_dictionary_from_kind(DictionaryKind::IPADIC)?;
        let segmenter = Segmenter::new(Mode::Normal, dictionary, None);
        Ok(Self {
            tokenizer: LinderaTokenizer::new(segmenter),
            stopwords: default_japanese_stopwords(),
        })
    }
}

impl SparseTokenizer for JapaneseTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let Ok(mut tokens) = self.tokenizer.tokenize(text) else {
            return Vec::new();
        };

        tokens
            .iter_mut()
            .filter_map(|token| {
                let details = token.details();
                let pos = details.first().copied().unwrap_or("");
                if pos == AUXILIARY_SYMBOL_POS {
                    return None;
                }
                let surface = token.text.to_string();
                if self.stopwords.contains(&surface) {
                    return None;
                }
                Some(
                    details
                        .get(6)
                        .map(|s| (*s).to_string())
                        .unwrap_or(surface),
                )
            })
            .collect()
    }
}

/// A minimal, bundled Japanese stopword set covering the most common
/// particles and auxiliary verbs, standing in for `stopwords-iso`'s Japanese
/// list.
fn default_japanese_stopwords() -> std::collections::HashSet<String> {
    [
        "の", "に", "は", "を", "た", "が", "で", "て", "と", "し", "れ", "さ", "ある", "いる",
        "も", "する", "から", "な", "こと", "として", "い", "や", "れる", "など", "なっ", "ない",
        "この", "ため", "その", "あっ", "よう", "また", "もの", "という", "あり", "まで", "られ",
        "なる", "へ", "か", "だ", "これ", "によって", "により", "おり", "より", "による", "ず",
        "なり", "られる", "において", "ば", "なかっ", "なく", "しかし", "について", "せ", "だっ",
        "その後", "できる", "それ", "う", "ので", "なお", "のみ", "でき", "き", "つ", "における",
        "および", "いう", "さらに", "でも", "ら", "たり", "その他", "に関する", "たち", "ます",
        "ん", "なら", "に対して", "特に", "せる", "及び", "これら", "とき", "では", "にて",
        "ほか", "ながら", "うち", "そして", "とともに", "ただし", "かつて", "それぞれ", "または",
        "お", "ほど", "ものの", "に対する", "ほとんど", "と共に", "といった", "です", "とも",
        "ところ", "ここ",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Pass-through tokenizer for non-Japanese text: delegates to a Snowball
/// stemmer, mirroring fastembed's built-in BM25 stemming pipeline.
pub struct PassthroughTokenizer {
    stemmer: Stemmer,
}

impl PassthroughTokenizer {
    /// Builds a pass-through tokenizer using the English Snowball stemmer.
    #[must_use]
    pub fn english() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Builds a pass-through tokenizer for the given Snowball algorithm.
    #[must_use]
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        Self {
            stemmer: Stemmer::create(algorithm),
        }
    }
}

impl SparseTokenizer for PassthroughTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|word| {
                let lower = word.to_lowercase();
                let cleaned: String = lower.chars().filter(|c| c.is_alphanumeric()).collect();
                self.stemmer.stem(&cleaned).into_owned()
            })
            .filter(|w| !w.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_stems_and_lowercases() {
        let tokenizer = PassthroughTokenizer::english();
        let tokens = tokenizer.tokenize("Running runners ran");
        assert!(tokens.iter().all(|t| t.chars().all(|c| c.is_lowercase() || c.is_numeric())));
    }

    #[test]
    fn passthrough_drops_empty_tokens_from_punctuation() {
        let tokenizer = PassthroughTokenizer::english();
        let tokens = tokenizer.tokenize("hello , , world");
        assert_eq!(tokens, vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn japanese_stopwords_set_is_nonempty() {
        let stopwords = default_japanese_stopwords();
        assert!(stopwords.contains("の"));
        assert!(!stopwords.is_empty());
    }
}
