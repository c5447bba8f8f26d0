//! Charset-cascade byte-to-text decoding, grounded on
//! `TextFileProcessor.extract_text_from_bytes` / `HTMLProcessor.extract_text_from_bytes`:
//! try UTF-8, then Shift-JIS, then CP932, in that order.

use crate::IngestError;

/// Decodes `bytes` as text, trying UTF-8, then Shift-JIS, then CP932.
///
/// # Errors
/// Returns [`IngestError::Decode`] if none of the three candidate charsets
/// decode without replacement characters.
pub fn decode_cascade(bytes: &[u8], source: &str) -> Result<String, IngestError> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }
    for encoding in [encoding_rs::SHIFT_JIS, encoding_rs::WINDOWS_31J] {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Ok(text.into_owned());
        }
    }
    Err(IngestError::Decode {
        source: source.to_string(),
        reason: "could not recognize the text encoding".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_utf8() {
        let decoded = decode_cascade("hello world".as_bytes(), "test.txt").unwrap();
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn decodes_shift_jis_fallback() {
        let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode("こんにちは");
        assert!(!had_errors);
        let decoded = decode_cascade(&bytes, "test.txt").unwrap();
        assert_eq!(decoded, "こんにちは");
    }

    #[test]
    fn invalid_bytes_fail_every_charset() {
        let bytes = [0xFF, 0xFE, 0x00, 0xFF, 0xFE];
        let err = decode_cascade(&bytes, "test.bin").unwrap_err();
        assert!(matches!(err, IngestError::Decode { .. }));
    }
}
