//! Pooling strategies for extracting embeddings from transformer outputs.

use ndarray::ArrayView3;

/// Strategy for pooling hidden states into a single embedding vector.
///
/// Different embedding models require different pooling strategies:
/// - Decoder models (Qwen3-Embedding) use [`LastToken`](PoolingStrategy::LastToken)
/// - Encoder models (BERT, MiniLM) typically use [`Cls`](PoolingStrategy::Cls) or [`Mean`](PoolingStrategy::Mean)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PoolingStrategy {
    /// Use the last non-padding token's hidden state.
    #[default]
    LastToken,
    /// Average all non-padding token hidden states.
    Mean,
    /// Use the first token's hidden state (typically `[CLS]`).
    Cls,
}

impl PoolingStrategy {
    /// Applies the pooling strategy to hidden states.
    ///
    /// `hidden_states` has shape `[batch=1, seq_len, hidden_dim]`.
    #[must_use]
    pub fn apply(&self, hidden_states: &ArrayView3<f32>, attention_mask: &[u32]) -> Vec<f32> {
        let seq_len = hidden_states.shape()[1];
        let hidden_dim = hidden_states.shape()[2];

        match self {
            Self::LastToken => {
                let last_idx = attention_mask
                    .iter()
                    .rposition(|&m| m != 0)
                    .unwrap_or(seq_len - 1);
                (0..hidden_dim)
                    .map(|d| hidden_states[[0, last_idx, d]])
                    .collect()
            }
            Self::Mean => {
                let valid_count: f32 = attention_mask.iter().map(|&m| m as f32).sum();
                if valid_count == 0.0 {
                    return vec![0.0; hidden_dim];
                }
                let mut result = vec![0.0; hidden_dim];
                for (seq_idx, &mask) in attention_mask.iter().enumerate() {
                    if mask != 0 {
                        for (d, value) in result.iter_mut().enumerate() {
                            *value += hidden_states[[0, seq_idx, d]];
                        }
                    }
                }
                for value in &mut result {
                    *value /= valid_count;
                }
                result
            }
            Self::Cls => (0..hidden_dim).map(|d| hidden_states[[0, 0, d]]).collect(),
        }
    }
}

/// L2-normalizes a vector in place.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn last_token_pooling() {
        let hidden = Array3::from_shape_vec(
            (1, 3, 4),
            vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
            ],
        )
        .unwrap();
        let mask = vec![1, 1, 1];
        let result = PoolingStrategy::LastToken.apply(&hidden.view(), &mask);
        assert_eq!(result, vec![9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn last_token_with_padding() {
        let hidden = Array3::from_shape_vec(
            (1, 3, 4),
            vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 0.0, 0.0, 0.0, 0.0,
            ],
        )
        .unwrap();
        let mask = vec![1, 1, 0];
        let result = PoolingStrategy::LastToken.apply(&hidden.view(), &mask);
        assert_eq!(result, vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn mean_pooling() {
        let hidden = Array3::from_shape_vec(
            (1, 3, 4),
            vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
            ],
        )
        .unwrap();
        let mask = vec![1, 1, 0];
        let result = PoolingStrategy::Mean.apply(&hidden.view(), &mask);
        assert_eq!(result, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn cls_pooling() {
        let hidden = Array3::from_shape_vec(
            (1, 3, 4),
            vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
            ],
        )
        .unwrap();
        let mask = vec![1, 1, 1];
        let result = PoolingStrategy::Cls.apply(&hidden.view(), &mask);
        assert_eq!(result, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn l2_normalize_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_vector_stays_zero() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
