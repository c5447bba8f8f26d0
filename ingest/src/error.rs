//! Ingestion-specific errors.

use thiserror::Error;

/// Errors raised while extracting text from a file or URI.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No processor registered for this extension or content-type.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The input could not be decoded in any candidate charset.
    #[error("could not decode {source}: {reason}")]
    Decode {
        /// The file or URI that failed to decode.
        source: String,
        /// Human-readable reason, no raw codec internals.
        reason: String,
    },

    /// The URI itself was malformed (missing scheme or host).
    #[error("invalid URI: {0}")]
    InvalidUri(String),

    /// Fetching a remote URI failed or returned a non-success status.
    #[error("failed to fetch {uri}: {reason}")]
    Fetch {
        /// The URI that failed to fetch.
        uri: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The extractor itself failed (malformed PDF/docx/xlsx/pptx, etc).
    #[error("failed to extract {source}: {reason}")]
    Extraction {
        /// The file or URI whose extraction failed.
        source: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl From<IngestError> for ragcore_core::error::CoreError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::UnsupportedFormat(_) | IngestError::InvalidUri(_) => {
                Self::InputRejected(e.to_string())
            }
            IngestError::Decode { source, reason } => Self::Decode { source, reason },
            IngestError::Fetch { .. } => Self::Upstream {
                system: "ingest",
                message: e.to_string(),
            },
            IngestError::Extraction { .. } => Self::InputRejected(e.to_string()),
        }
    }
}
