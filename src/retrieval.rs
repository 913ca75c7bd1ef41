//! Semantic retrieval over every persisted chunk.
//!
//! There is no persistent vector index: each [`RetrievalIndex::retrieve`] call loads all
//! chunks, embeds them together with the query, and ranks by cosine similarity. Ties
//! are broken by load order (earlier wins), so identical inputs give identical output.

use std::sync::Arc;

use serde::Serialize;

use crate::documents::store::{ChunkStore, TextChunk};
use crate::embedding::{cosine_similarity, EmbeddingCapability, EmbeddingProvider};

/// Chunks are embedded in batches of this size.
const EMBED_BATCH_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The embedding oracle could not be initialized or failed to embed.
    #[error("embedding provider unavailable: {0}")]
    UnavailableDependency(String),
    #[error("embedding provider returned {got} vectors for {expected} inputs")]
    EmbeddingCountMismatch { expected: usize, got: usize },
    #[error("failed to load chunk store: {0:#}")]
    Store(anyhow::Error),
}

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: TextChunk,
    pub score: f32,
}

pub struct RetrievalIndex {
    store: ChunkStore,
    embedding: Arc<EmbeddingCapability>,
}

impl RetrievalIndex {
    pub fn new(store: ChunkStore, embedding: Arc<EmbeddingCapability>) -> Self {
        Self { store, embedding }
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Up to `top_k` chunks, most similar first. An empty store yields an empty result
    /// without touching the embedding oracle.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let set = self.store.load_all().map_err(RetrievalError::Store)?;
        if set.chunks.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let embedder = self
            .embedding
            .get()
            .map_err(RetrievalError::UnavailableDependency)?;

        let query_vec = embed_all(embedder.as_ref(), &[query])?
            .pop()
            .ok_or(RetrievalError::EmbeddingCountMismatch { expected: 1, got: 0 })?;
        let texts: Vec<&str> = set.chunks.iter().map(|c| c.text.as_str()).collect();
        let chunk_vecs = embed_all(embedder.as_ref(), &texts)?;

        let scores: Vec<f32> = chunk_vecs
            .iter()
            .map(|v| cosine_similarity(&query_vec, v))
            .collect();
        let ranked = rank_top_k(&scores, top_k);

        tracing::debug!(
            query_len = query.len(),
            candidates = set.chunks.len(),
            returned = ranked.len(),
            "retrieval complete"
        );

        let mut chunks: Vec<Option<TextChunk>> = set.chunks.into_iter().map(Some).collect();
        Ok(ranked
            .into_iter()
            .filter_map(|i| {
                chunks[i].take().map(|chunk| ScoredChunk {
                    chunk,
                    score: scores[i],
                })
            })
            .collect())
    }
}

/// Embed `texts` in batches, checking that every input got a vector.
fn embed_all(
    embedder: &dyn EmbeddingProvider,
    texts: &[&str],
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        let embedded = embedder
            .embed_batch(batch)
            .map_err(|e| RetrievalError::UnavailableDependency(format!("{e:#}")))?;
        if embedded.len() != batch.len() {
            return Err(RetrievalError::EmbeddingCountMismatch {
                expected: batch.len(),
                got: embedded.len(),
            });
        }
        vectors.extend(embedded);
    }
    Ok(vectors)
}

/// Indices of the `k` highest scores, descending; equal scores keep index order.
/// NaN scores rank last.
pub fn rank_top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let key = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| key(scores[b]).total_cmp(&key(scores[a])).then(a.cmp(&b)));
    order.truncate(k);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_orders_descending_with_index_tie_break() {
        let scores = [0.2, 0.9, 0.5, 0.9, f32::NAN];
        assert_eq!(rank_top_k(&scores, 3), vec![1, 3, 2]);
        assert_eq!(rank_top_k(&scores, 10), vec![1, 3, 2, 0, 4]);
        assert!(rank_top_k(&scores, 0).is_empty());
    }
}
