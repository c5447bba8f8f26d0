//! Cross-encoder reranking.
//!
//! Grounded on `spec.md` §4.4's `rerank` contract and ported from the
//! teacher's `ort` session-setup pattern: a cross-encoder jointly encodes
//! `(query, candidate)` and emits one relevance logit per pair, unlike the
//! dense/sparse embedders which encode each side independently.

use ort::session::{Session, builder::GraphOptimizationLevel};
use ragcore_core::error::Result;
use ragcore_core::model::SearchHit;
use ragcore_core::rerank::Reranker;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokenizers::Tokenizer;

use crate::error::EmbeddingError;

/// A reranker backed by a cross-encoder ONNX checkpoint.
pub struct CrossEncoderReranker {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl CrossEncoderReranker {
    /// Loads a cross-encoder model from a directory containing `model.onnx`
    /// and `tokenizer.json`.
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

    fn score(&self, query: &str, candidate: &str) -> std::result::Result<f32, EmbeddingError> {
        let encoding = self
            .tokenizer
            .encode((query, candidate), true)
            .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;

        let ids = encoding.get_ids();
        let seq_len = ids.len();
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
        let raw = view
            .iter()
            .next()
            .copied()
            .ok_or(EmbeddingError::InvalidOutputShape(0))?;

        Ok(sigmoid(raw))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
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

impl Reranker for CrossEncoderReranker {
    fn rerank(
        &self,
        query: &str,
        hits: Vec<SearchHit>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        let mut scored = Vec::with_capacity(hits.len());
        for mut hit in hits {
            let score = self.score(query, hit.text())?;
            hit.score = score;
            scored.push(hit);
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.retain(|hit| hit.score >= score_threshold);
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_maps_zero_to_half() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn missing_directory_reports_model_not_found() {
        let result = CrossEncoderReranker::from_directory("/nonexistent/cross-encoder");
        assert!(matches!(result, Err(EmbeddingError::ModelNotFound(_))));
    }
}
