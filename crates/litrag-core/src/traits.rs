use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{Chunk, ChunkId};

/// Synchronous, in-process text embedder (local model or hash based).
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Read-only supplier of the corpus, called once per index build.
pub trait ChunkSource: Send + Sync {
    fn list_chunks(&self) -> Result<Vec<Chunk>>;
}

impl ChunkSource for Vec<Chunk> {
    fn list_chunks(&self) -> Result<Vec<Chunk>> { Ok(self.clone()) }
}

/// External embedding provider. Fails with `Error::EmbeddingUnavailable`.
pub trait EmbeddingProvider: Send + Sync {
    /// Dimensionality every returned vector has.
    fn dim(&self) -> usize;
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// How a similarity backend reports closeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    /// Higher is more similar; passed through unchanged.
    Similarity,
    /// Cosine distance in [0, 2]; converted to `1 - d`.
    CosineDistance,
    /// Any other distance; negated.
    Distance,
}

/// External vector-similarity backend. Fails with `Error::BackendUnavailable`.
pub trait SimilarityBackend: Send + Sync {
    fn score_kind(&self) -> ScoreKind;

    /// Up to `k` nearest chunks, in the backend's own order and scale.
    fn nearest<'a>(&'a self, vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<(ChunkId, f32)>>>;

    /// Replace the backend contents with `chunks`. Readers must keep seeing
    /// the previous contents until the replacement is complete.
    fn populate<'a>(&'a self, chunks: &'a [Chunk]) -> BoxFuture<'a, Result<()>>;
}
