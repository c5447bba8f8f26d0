//! SPLADE learned sparse embedding.
//!
//! Grounded on `original_source/tiny_chat/database/embeddings/splade_embedding.py`:
//! run the masked-language-model head of a SPLADE checkpoint, pool per-token
//! logits into a vocabulary-sized sparse vector with `log(1 + relu(x))` then
//! max-over-sequence, keep the nonzero vocabulary entries, and hash each
//! token's surface string into a stable dimension id (the Python original
//! uses `mmh3`; this hashes with the same `xxhash` used by [`crate::bm25`]
//! so the whole crate depends on one hashing primitive instead of two).

use ort::session::{Session, builder::GraphOptimizationLevel};
use ragcore_core::embedding::{SparseEmbedder, SparseVector};
use ragcore_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokenizers::Tokenizer;
use xxhash_rust::xxh32::xxh32;

use crate::error::EmbeddingError;

/// A learned sparse embedder backed by a SPLADE-family ONNX checkpoint.
pub struct SpladeEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_seq_length: usize,
}

impl SpladeEmbedder {
    /// Loads a SPLADE model from a directory containing `model.onnx` and
    /// `tokenizer.json`.
    ///
    /// # Errors
    /// Returns an error if either file is missing or fails to load.
    pub fn from_directory(path: impl AsRef<Path>) -> std::result::Result<Self, EmbeddingError> {
        let dir = path.as_ref();
        let model_path = find_file(dir, "model.onnx")?;
        let tokenizer_path = find_file(dir, "tokenizer.json")?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::tokenizer(&tokenizer_path, e))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&model_path)?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_seq_length: 512,
        })
    }

    fn encode(&self, text: &str) -> std::result::Result<SparseVector, EmbeddingError> {
        let mut encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;
        encoding.truncate(self.max_seq_length, 0, tokenizers::TruncationDirection::Right);

        let ids = encoding.get_ids();
        let seq_len = ids.len();
        if seq_len == 0 {
            return Ok(SparseVector::new(Vec::new()));
        }

        let input_ids: Vec<i64> = ids.iter().map(|&id| i64::from(id)).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| i64::from(m))
            .collect();

        let input_ids_tensor =
            ort::value::Tensor::from_array(([1, seq_len], input_ids.into_boxed_slice()))?;
        let attention_mask_tensor =
            ort::value::Tensor::from_array(([1, seq_len], attention_mask.into_boxed_slice()))?;

        let mut session = self.session.lock().expect("session lock poisoned");
        let outputs = session.run(ort::inputs![
            "input_ids" => input_ids_tensor,
            "attention_mask" => attention_mask_tensor,
        ])?;

        let logits = outputs
            .get("logits")
            .or_else(|| outputs.get("output"))
            .ok_or(EmbeddingError::InvalidOutputShape(0))?;
        let view = logits.try_extract_array::<f32>()?;
        let shape = view.shape();
        if shape.len() != 3 {
            return Err(EmbeddingError::InvalidOutputShape(shape.len()));
        }
        let vocab_size = shape[2];

        let mut pooled = vec![0.0f32; vocab_size];
        for t in 0..shape[1] {
            if encoding.get_attention_mask()[t] == 0 {
                continue;
            }
            for v in 0..vocab_size {
                let x = view[[0, t, v]];
                let activated = (1.0 + x.max(0.0)).ln();
                if activated > pooled[v] {
                    pooled[v] = activated;
                }
            }
        }

        let pairs: Vec<(i32, f32)> = pooled
            .into_iter()
            .enumerate()
            .filter(|(_, weight)| *weight > 0.0)
            .filter_map(|(vocab_id, weight)| {
                #[allow(clippy::cast_possible_truncation)]
                let token = self.tokenizer.id_to_token(vocab_id as u32)?;
                Some((token_dimension(&token), weight))
            })
            .collect();

        Ok(SparseVector::new(pairs))
    }
}

fn token_dimension(token: &str) -> i32 {
    #[allow(clippy::cast_possible_wrap)]
    let index = (xxh32(token.as_bytes(), 0) & 0x7fff_ffff) as i32;
    index
}

fn find_file(dir: &Path, name: &str) -> std::result::Result<PathBuf, EmbeddingError> {
    let direct = dir.join(name);
    if direct.exists() {
        return Ok(direct);
    }
    let nested = dir.join("onnx").join(name);
    if nested.exists() {
        return Ok(nested);
    }
    if name.ends_with(".onnx") {
        Err(EmbeddingError::ModelNotFound(dir.to_path_buf()))
    } else {
        Err(EmbeddingError::TokenizerNotFound(dir.to_path_buf()))
    }
}

impl SparseEmbedder for SpladeEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        texts
            .iter()
            .map(|t| self.encode(t).map_err(Into::into))
            .collect()
    }

    fn query_embed(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        self.embed(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_reports_model_not_found() {
        let result = SpladeEmbedder::from_directory("/nonexistent/splade");
        assert!(matches!(result, Err(EmbeddingError::ModelNotFound(_))));
    }
}
