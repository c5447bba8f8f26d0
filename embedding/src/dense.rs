//! ONNX Runtime-backed dense embedding.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Ix3;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ragcore_core::embedding::DenseEmbedder;
use ragcore_core::error::Result;
use tokenizers::Tokenizer;

use crate::error::EmbeddingError;
use crate::pooling::{PoolingStrategy, l2_normalize};

/// A dense embedding model backed by a local ONNX Runtime session.
///
/// Prefix policy — whether documents get a corpus marker and queries get a
/// query marker before encoding — is a property of this backend
/// ([`doc_prefix`](OnnxDenseEmbedder::builder)/[`query_prefix`](OnnxDenseEmbedder::builder)),
/// never something the caller decides per call.
pub struct OnnxDenseEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
    pooling: PoolingStrategy,
    normalize: bool,
    doc_prefix: Option<String>,
    query_prefix: Option<String>,
}

impl std::fmt::Debug for OnnxDenseEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDenseEmbedder")
            .field("dimension", &self.dimension)
            .field("pooling", &self.pooling)
            .field("normalize", &self.normalize)
            .finish_non_exhaustive()
    }
}

impl OnnxDenseEmbedder {
    /// Loads a model from a directory, auto-locating `model.onnx` and
    /// `tokenizer.json`, with GPU execution providers disabled.
    ///
    /// # Errors
    /// Returns an error if the model or tokenizer cannot be found or loaded.
    pub fn from_directory(path: impl AsRef<Path>) -> std::result::Result<Self, EmbeddingError> {
        Self::from_directory_with_gpu(path, false)
    }

    /// Loads a model from a directory, auto-locating `model.onnx` and
    /// `tokenizer.json`, enabling GPU execution providers and half-precision
    /// when `use_gpu` is set (`spec.md` §4.3).
    ///
    /// # Errors
    /// Returns an error if the model or tokenizer cannot be found or loaded.
    pub fn from_directory_with_gpu(
        path: impl AsRef<Path>,
        use_gpu: bool,
    ) -> std::result::Result<Self, EmbeddingError> {
        let dir = path.as_ref();
        let model_path = find_model_file(dir)?;
        let tokenizer_path = find_tokenizer_file(dir)?;
        Self::builder()
            .model_path(model_path)
            .tokenizer_path(tokenizer_path)
            .use_gpu(use_gpu)
            .build()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> OnnxDenseEmbedderBuilder {
        OnnxDenseEmbedderBuilder::default()
    }

    /// Embeds one piece of text, applying `prefix` if set.
    fn embed_one(&self, text: &str, prefix: Option<&str>) -> Result<Vec<f32>> {
        let prefixed;
        let text = match prefix {
            Some(p) => {
                prefixed = format!("{p}{text}");
                prefixed.as_str()
            }
            None => text,
        };

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| i64::from(m))
            .collect();
        let seq_len = input_ids.len();

        let input_ids_tensor =
            ort::value::Tensor::from_array(([1, seq_len], input_ids.into_boxed_slice()))
                .map_err(EmbeddingError::from)?;
        let attention_mask_tensor =
            ort::value::Tensor::from_array(([1, seq_len], attention_mask.into_boxed_slice()))
                .map_err(EmbeddingError::from)?;

        let hidden_states_owned = {
            let mut session = self.session.lock().expect("session lock poisoned");
            let outputs = session
                .run(ort::inputs![
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor,
                ])
                .map_err(EmbeddingError::from)?;

            let hidden_states = outputs
                .get("last_hidden_state")
                .or_else(|| outputs.get("hidden_states"))
                .or_else(|| outputs.get("output"))
                .ok_or(EmbeddingError::InvalidOutputShape(0))?;

            let view = hidden_states
                .try_extract_array::<f32>()
                .map_err(EmbeddingError::from)?;
            view.to_owned()
        };

        let shape = hidden_states_owned.shape();
        if shape.len() != 3 {
            return Err(EmbeddingError::InvalidOutputShape(shape.len()).into());
        }

        let view_3d = hidden_states_owned
            .into_dimensionality::<Ix3>()
            .map_err(|e| EmbeddingError::Shape(e.to_string()))?;

        let attention_mask_u32: Vec<u32> = encoding.get_attention_mask().to_vec();
        let mut embedding = self.pooling.apply(&view_3d.view(), &attention_mask_u32);

        if self.normalize {
            l2_normalize(&mut embedding);
        }

        Ok(embedding)
    }
}

impl DenseEmbedder for OnnxDenseEmbedder {
    fn dim(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| self.embed_one(t, self.doc_prefix.as_deref()))
            .collect()
    }

    fn query_embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| self.embed_one(t, self.query_prefix.as_deref()))
            .collect()
    }
}

/// Builder for [`OnnxDenseEmbedder`].
#[derive(Debug, Default)]
pub struct OnnxDenseEmbedderBuilder {
    model_path: Option<PathBuf>,
    tokenizer_path: Option<PathBuf>,
    pooling: PoolingStrategy,
    normalize: bool,
    use_gpu: bool,
    doc_prefix: Option<String>,
    query_prefix: Option<String>,
}

impl OnnxDenseEmbedderBuilder {
    /// Sets the path to the ONNX model file.
    #[must_use]
    pub fn model_path(mut self, path: impl AsRef<Path>) -> Self {
        self.model_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the path to `tokenizer.json`.
    #[must_use]
    pub fn tokenizer_path(mut self, path: impl AsRef<Path>) -> Self {
        self.tokenizer_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the pooling strategy. Default: [`PoolingStrategy::Mean`].
    #[must_use]
    pub const fn pooling(mut self, strategy: PoolingStrategy) -> Self {
        self.pooling = strategy;
        self
    }

    /// Enables or disables L2 normalization. Default: `true`.
    #[must_use]
    pub const fn normalize(mut self, enabled: bool) -> Self {
        self.normalize = enabled;
        self
    }

    /// Runs inference with GPU execution providers and half precision,
    /// per `spec.md` §4.3's "on GPU, half-precision is enabled" rule. Has no
    /// effect unless the `cuda`/`coreml` features are active and hardware is
    /// available; falls back to CPU silently otherwise.
    #[must_use]
    pub const fn use_gpu(mut self, enabled: bool) -> Self {
        self.use_gpu = enabled;
        self
    }

    /// Sets the corpus marker prepended to documents before encoding.
    #[must_use]
    pub fn doc_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.doc_prefix = Some(prefix.into());
        self
    }

    /// Sets the query marker prepended to queries before encoding.
    #[must_use]
    pub fn query_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.query_prefix = Some(prefix.into());
        self
    }

    /// Builds the [`OnnxDenseEmbedder`].
    ///
    /// # Errors
    /// Returns an error if the model/tokenizer cannot be loaded or the
    /// output dimension cannot be detected.
    pub fn build(self) -> std::result::Result<OnnxDenseEmbedder, EmbeddingError> {
        let model_path = self.model_path.ok_or(EmbeddingError::MissingModelPath)?;
        if !model_path.exists() {
            return Err(EmbeddingError::ModelNotFound(model_path));
        }

        let tokenizer_path = self.tokenizer_path.ok_or_else(|| {
            EmbeddingError::TokenizerNotFound(
                model_path.parent().unwrap_or(&model_path).to_path_buf(),
            )
        })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::tokenizer(&tokenizer_path, e))?;

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(num_cpus())?;

        if self.use_gpu {
            builder = register_gpu_providers(builder)?;
        }

        let session = builder.commit_from_file(&model_path)?;

        let dimension = detect_embedding_dimension(&session)?;

        Ok(OnnxDenseEmbedder {
            session: Mutex::new(session),
            tokenizer,
            dimension,
            pooling: self.pooling,
            normalize: self.normalize,
            doc_prefix: self.doc_prefix,
            query_prefix: self.query_prefix,
        })
    }
}

fn register_gpu_providers(
    builder: ort::session::builder::SessionBuilder,
) -> std::result::Result<ort::session::builder::SessionBuilder, EmbeddingError> {
    #[cfg(feature = "cuda")]
    let builder = builder
        .with_execution_providers([ort::execution_providers::CUDAExecutionProvider::default()
            .build()])?;
    #[cfg(feature = "coreml")]
    let builder = builder
        .with_execution_providers([ort::execution_providers::CoreMLExecutionProvider::default()
            .build()])?;
    Ok(builder)
}

fn find_model_file(dir: &Path) -> std::result::Result<PathBuf, EmbeddingError> {
    let candidates = [
        dir.join("model.onnx"),
        dir.join("onnx/model.onnx"),
        dir.join("onnx/model_fp32.onnx"),
        dir.join("onnx/model_fp16.onnx"),
        dir.join("onnx/model_q8.onnx"),
    ];
    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.clone());
        }
    }
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "onnx") {
                return Ok(path);
            }
        }
    }
    Err(EmbeddingError::ModelNotFound(dir.to_path_buf()))
}

fn find_tokenizer_file(dir: &Path) -> std::result::Result<PathBuf, EmbeddingError> {
    let candidates = [dir.join("tokenizer.json"), dir.join("onnx/tokenizer.json")];
    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.clone());
        }
    }
    Err(EmbeddingError::TokenizerNotFound(dir.to_path_buf()))
}

fn detect_embedding_dimension(session: &Session) -> std::result::Result<usize, EmbeddingError> {
    for output in session.outputs() {
        if let ort::value::ValueType::Tensor { shape, .. } = output.dtype() {
            if let Some(&dim) = shape.last() {
                if dim > 0 {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    return Ok(dim as usize);
                }
            }
        }
    }
    Err(EmbeddingError::InvalidOutputShape(0))
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_model_path() {
        let result = OnnxDenseEmbedderBuilder::default().build();
        assert!(matches!(result, Err(EmbeddingError::MissingModelPath)));
    }

    #[test]
    fn builder_validates_model_exists() {
        let result = OnnxDenseEmbedderBuilder::default()
            .model_path("/nonexistent/model.onnx")
            .tokenizer_path("/nonexistent/tokenizer.json")
            .build();
        assert!(matches!(result, Err(EmbeddingError::ModelNotFound(_))));
    }
}
