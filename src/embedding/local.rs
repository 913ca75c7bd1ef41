//! Local ONNX Runtime embedding provider.
//!
//! Runs all-MiniLM-L6-v2 through `ort`: tokenization, inference, attention-masked mean
//! pooling, then L2 normalization so cosine similarity reduces to a dot product.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// Maximum sequence length for all-MiniLM-L6-v2 (trained at 256).
const MAX_SEQ_LEN: usize = 256;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Local ONNX-based embedding provider using all-MiniLM-L6-v2.
pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex.
// The Mutex guarantees exclusive access during run().
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

/// Token ids and attention mask for a padded batch, flattened row-major.
struct EncodedBatch {
    batch_size: usize,
    seq_len: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
}

/// Paths of the model and tokenizer inside the configured cache directory.
pub fn model_paths(config: &EmbeddingConfig) -> (PathBuf, PathBuf) {
    let cache_dir = crate::config::expand_tilde(&config.cache_dir);
    (cache_dir.join(MODEL_FILE), cache_dir.join(TOKENIZER_FILE))
}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_path, tokenizer_path) = model_paths(config);

        anyhow::ensure!(
            model_path.exists(),
            "ONNX model not found at {}. Run `quarry model download` first.",
            model_path.display()
        );
        anyhow::ensure!(
            tokenizer_path.exists(),
            "Tokenizer not found at {}. Run `quarry model download` first.",
            tokenizer_path.display()
        );

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;
        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tracing::info!(tokenizer = %tokenizer_path.display(), "tokenizer loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn encode(&self, texts: &[&str]) -> Result<EncodedBatch> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let batch_size = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        Ok(EncodedBatch {
            batch_size,
            seq_len,
            input_ids,
            attention_mask,
        })
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .context("embedding batch returned no vectors")
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batch = self.encode(texts)?;
        let shape = vec![batch.batch_size as i64, batch.seq_len as i64];
        let input_ids =
            Tensor::from_array((shape.clone(), batch.input_ids.clone().into_boxed_slice()))?;
        let attention_mask = Tensor::from_array((
            shape.clone(),
            batch.attention_mask.clone().into_boxed_slice(),
        ))?;
        // single-segment input
        let token_type_ids = Tensor::from_array((
            shape,
            vec![0i64; batch.batch_size * batch.seq_len].into_boxed_slice(),
        ))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => input_ids,
            "attention_mask" => attention_mask,
            "token_type_ids" => token_type_ids,
        })?;

        // Output naming differs between exports.
        let token_embeddings = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);
        let (dims, data) = token_embeddings
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings tensor")?;

        let dims: &[i64] = &dims;
        anyhow::ensure!(
            dims.len() == 3 && dims[2] == EMBEDDING_DIM as i64,
            "unexpected token embeddings shape: {dims:?}, expected [batch, seq, {EMBEDDING_DIM}]"
        );

        let pooled = mean_pool(
            data,
            &batch.attention_mask,
            batch.batch_size,
            batch.seq_len,
            dims[1] as usize,
            dims[2] as usize,
        );
        Ok(pooled.iter().map(|v| l2_normalize(v)).collect())
    }
}

/// Average token vectors per row, counting only positions where the mask is set.
///
/// `mask_seq_len` is the padded length the mask was built with; `out_seq_len` is the
/// sequence length reported by the model output.
fn mean_pool(
    data: &[f32],
    mask: &[i64],
    batch_size: usize,
    mask_seq_len: usize,
    out_seq_len: usize,
    hidden_dim: usize,
) -> Vec<Vec<f32>> {
    (0..batch_size)
        .map(|b| {
            let mut sum = vec![0.0f32; hidden_dim];
            let mut count = 0.0f32;
            for s in 0..out_seq_len.min(mask_seq_len) {
                let weight = mask[b * mask_seq_len + s] as f32;
                if weight <= 0.0 {
                    continue;
                }
                let offset = (b * out_seq_len + s) * hidden_dim;
                for (d, acc) in sum.iter_mut().enumerate() {
                    *acc += data[offset + d] * weight;
                }
                count += weight;
            }
            if count > 0.0 {
                sum.iter_mut().for_each(|x| *x /= count);
            }
            sum
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    fn test_config() -> EmbeddingConfig {
        EmbeddingConfig::default()
    }

    #[test]
    fn mean_pool_ignores_padding() {
        // batch of 1, 3 positions, hidden 2; last position is padding
        let data = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
        let mask = [1, 1, 0];
        let pooled = mean_pool(&data, &mask, 1, 3, 3, 2);
        assert_eq!(pooled, vec![vec![2.0, 3.0]]);
    }

    #[test]
    fn missing_model_files_are_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = EmbeddingConfig {
            cache_dir: tmp.path().to_string_lossy().into_owned(),
            ..EmbeddingConfig::default()
        };
        let err = LocalEmbeddingProvider::new(&config).err().unwrap();
        assert!(err.to_string().contains("quarry model download"));
    }

    #[test]
    #[ignore] // Requires model files, run with: cargo test -- --ignored
    fn test_embed_produces_384_dims() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let embedding = provider.embed("Hello world").unwrap();
        assert_eq!(embedding.len(), EMBEDDING_DIM);
    }

    #[test]
    #[ignore]
    fn test_embed_is_deterministic() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let a = provider.embed("Rust is a systems programming language").unwrap();
        let b = provider.embed("Rust is a systems programming language").unwrap();
        assert_eq!(a, b, "same input must produce identical output");
    }

    #[test]
    #[ignore]
    fn test_embed_batch_is_normalized() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let embeddings = provider
            .embed_batch(&["First sentence", "Second sentence", "Third sentence"])
            .unwrap();
        assert_eq!(embeddings.len(), 3);
        for emb in &embeddings {
            let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    #[ignore]
    fn test_similar_texts_rank_higher() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let cat = provider.embed("The cat sat on the mat").unwrap();
        let cat2 = provider.embed("A cat was sitting on a mat").unwrap();
        let qubits = provider.embed("Quantum computing uses qubits").unwrap();
        assert!(cosine_similarity(&cat, &cat2) > cosine_similarity(&cat, &qubits));
    }
}
