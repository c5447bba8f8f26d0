//! The hierarchical separator-cascade splitter.
//!
//! Grounded on `original_source/tiny_chat/database/embeddings/text_chunk.py`.
//! All lengths here are in **characters**, not bytes, so the cascade behaves
//! consistently across ASCII and multi-byte (Japanese) text.

/// The separator cascade, tried in order until one yields more than one
/// segment. The final entry (empty string) means "split into individual
/// characters".
const SEPARATORS: &[&str] = &[
    "\n\n",
    "\n",
    " ",
    ".",
    ",",
    "\u{200b}", // zero-width space
    "\u{ff0c}", // fullwidth comma
    "\u{3001}", // ideographic comma
    "\u{ff0e}", // fullwidth period
    "\u{3002}", // ideographic period
    "",
];

/// Splits `text` into an ordered sequence of chunks, each at most
/// `chunk_size` characters (except via the fixed-stride fallback, which is
/// exact), with a sliding overlap of approximately `chunk_overlap`
/// characters between adjacent chunks.
///
/// # Panics
/// Panics if `chunk_overlap >= chunk_size`, mirroring the fixed-size
/// chunker's constructor-time invariant.
#[must_use]
pub fn split(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    assert!(
        chunk_overlap < chunk_size,
        "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
    );

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    for separator in SEPARATORS {
        let segments = split_on_separator(&chars, separator);
        if segments.len() <= 1 {
            continue;
        }
        let chunks = assemble(&segments, separator, chunk_size, chunk_overlap);
        if !chunks.is_empty() {
            return chunks;
        }
    }

    fixed_stride(&chars, chunk_size, chunk_overlap)
}

/// Splits `chars` on `separator`, or into individual characters if
/// `separator` is empty.
fn split_on_separator(chars: &[char], separator: &str) -> Vec<Vec<char>> {
    if separator.is_empty() {
        return chars.iter().map(|c| vec![*c]).collect();
    }
    let sep_chars: Vec<char> = separator.chars().collect();
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i..].starts_with(sep_chars.as_slice()) {
            segments.push(std::mem::take(&mut current));
            i += sep_chars.len();
        } else {
            current.push(chars[i]);
            i += 1;
        }
    }
    segments.push(current);
    segments
}

/// Greedily accumulates segments into chunks of at most `chunk_size`
/// characters, carrying `chunk_overlap` characters of context from the tail
/// of each emitted chunk into the next.
fn assemble(
    segments: &[Vec<char>],
    separator: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<char> = Vec::new();

    for segment in segments {
        let candidate_len = if current.is_empty() {
            segment.len()
        } else {
            current.len() + separator.chars().count() + segment.len()
        };

        if candidate_len > chunk_size && !current.is_empty() {
            chunks.push(current.iter().collect::<String>());
            let overlap_start = current.len().saturating_sub(chunk_overlap);
            let mut next = current[overlap_start..].to_vec();
            next.extend(separator.chars());
            next.extend(segment.iter());
            current = next;
        } else if current.is_empty() {
            current = segment.clone();
        } else {
            current.extend(separator.chars());
            current.extend(segment.iter());
        }
    }

    if !current.is_empty() {
        chunks.push(current.iter().collect::<String>());
    }

    chunks
}

/// Fixed-stride slicing of width `chunk_size - chunk_overlap`, used when no
/// separator in the cascade produces any split at all.
fn fixed_stride(chars: &[char], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let step = chunk_size - chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split("hello world", 100, 10);
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn splits_on_paragraph_break() {
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph here.";
        let chunks = split(text, 30, 5);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30 || chunk.split_whitespace().count() <= 2);
        }
    }

    #[test]
    fn coverage_preserves_all_non_separator_characters() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = split(text, 20, 4);
        let joined_chars: std::collections::HashSet<char> =
            chunks.iter().flat_map(|c| c.chars()).collect();
        let original_chars: std::collections::HashSet<char> =
            text.chars().filter(|c| !c.is_whitespace()).collect();
        for c in original_chars {
            assert!(joined_chars.contains(&c), "missing character {c:?}");
        }
    }

    #[test]
    fn overlap_is_bounded() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let chunks = split(text, 15, 5);
        for pair in chunks.windows(2) {
            let prev_tail: Vec<char> = pair[0].chars().rev().take(5).collect();
            let next_head: Vec<char> = pair[1].chars().take(5).collect();
            let prev_tail_set: std::collections::HashSet<_> = prev_tail.into_iter().collect();
            let overlap_count = next_head.iter().filter(|c| prev_tail_set.contains(c)).count();
            assert!(overlap_count <= 5);
        }
    }

    #[test]
    fn falls_back_to_fixed_stride_when_no_separator_splits() {
        // No whitespace, no punctuation, no cascade separator anywhere --
        // only the char-level "" separator can split it, which always
        // succeeds, so exercise the true fallback by asserting its shape
        // directly instead.
        let chars: Vec<char> = "x".repeat(50).chars().collect();
        let chunks = fixed_stride(&chars, 10, 2);
        assert_eq!(chunks.len(), 7);
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(chunks.last().unwrap().chars().count(), 2);
    }

    #[test]
    fn no_chunk_is_empty() {
        let chunks = split("a b c d e f g h i j k l m n o p", 5, 1);
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    #[should_panic(expected = "chunk_overlap")]
    fn overlap_must_be_less_than_chunk_size() {
        let _ = split("text", 10, 10);
    }
}
