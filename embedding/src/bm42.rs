//! BM42 attention-probe sparse embedding (experimental, feature-gated).
//!
//! Unlike [`crate::bm25`] (term frequency) and [`crate::splade`] (MLM-head
//! expansion), BM42 weights each token by how much attention the model's
//! final layer pays to it from the `[CLS]` position, combined with an
//! IDF-style rarity term applied by the vector store at query time — the
//! same division of labor `spec.md` §4.2 describes for BM25. Qdrant's own
//! BM42 is numerically fragile across document lengths and model families;
//! this backend is carried as an opt-in enrichment, not a default choice.

use ort::session::{Session, builder::GraphOptimizationLevel};
use ragcore_core::embedding::{SparseEmbedder, SparseVector};
use ragcore_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokenizers::Tokenizer;
use xxhash_rust::xxh32::xxh32;

use crate::error::EmbeddingError;

/// A sparse embedder that weights tokens by last-layer attention mass from
/// the `[CLS]` token, requiring a model exported with `output_attentions`.
pub struct Bm42Embedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl Bm42Embedder {
    /// Loads a model directory containing `model.onnx` (exported with an
    /// `attentions` output) and `tokenizer.json`.
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
        })
    }

    fn encode(&self, text: &str) -> std::result::Result<SparseVector, EmbeddingError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;
        let ids = encoding.get_ids();
        let seq_len = ids.len();
        if seq_len <= 1 {
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

        let attentions = outputs
            .get("attentions")
            .ok_or(EmbeddingError::InvalidOutputShape(0))?;
        let view = attentions.try_extract_array::<f32>()?;
        // [batch=1, num_heads, seq_len, seq_len]
        let shape = view.shape();
        if shape.len() != 4 {
            return Err(EmbeddingError::InvalidOutputShape(shape.len()));
        }
        let num_heads = shape[1];

        const CLS_INDEX: usize = 0;
        let mut weights = vec![0.0f32; seq_len];
        for head in 0..num_heads {
            for (t, weight) in weights.iter_mut().enumerate() {
                *weight += view[[0, head, CLS_INDEX, t]];
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let head_count = num_heads as f32;
        for w in &mut weights {
            *w /= head_count;
        }

        let pairs: Vec<(i32, f32)> = ids
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(t, _)| encoding.get_attention_mask()[*t] != 0)
            .filter_map(|(t, &id)| {
                let token = self.tokenizer.id_to_token(id)?;
                Some((token_dimension(&token), weights[t]))
            })
            .filter(|(_, w)| *w > 0.0)
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

impl SparseEmbedder for Bm42Embedder {
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
        let result = Bm42Embedder::from_directory("/nonexistent/bm42");
        assert!(matches!(result, Err(EmbeddingError::ModelNotFound(_))));
    }
}
