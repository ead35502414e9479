use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::sync::Arc;

use litrag_core::traits::{ScoreKind, SimilarityBackend};
use litrag_core::types::{Chunk, ChunkId};
use litrag_core::Result;

struct Entry {
    id: ChunkId,
    vector: Vec<f32>,
    norm: f32,
}

/// Exhaustive cosine-similarity search over vectors held in memory.
///
/// `populate` builds the replacement table off to the side and swaps it in
/// under a short write lock; searches in flight keep the table they started on.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<Arc<Vec<Entry>>>,
}

fn norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

/// Cosine similarity in [-1, 1]; 0 when either side is the zero vector.
pub fn cosine_similarity(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 { return 0.0; }
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>() / (a_norm * b_norm)
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.read().len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn contains(&self, id: &str) -> bool { self.entries.read().iter().any(|e| e.id == id) }

    fn search(&self, query: &[f32], k: usize) -> Vec<(ChunkId, f32)> {
        let entries = Arc::clone(&self.entries.read());
        let q_norm = norm(query);
        let mut scored: Vec<(ChunkId, f32)> = entries
            .iter()
            .filter(|e| e.vector.len() == query.len())
            .map(|e| (e.id.clone(), cosine_similarity(query, q_norm, &e.vector, e.norm)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }
}

impl SimilarityBackend for MemoryBackend {
    fn score_kind(&self) -> ScoreKind { ScoreKind::Similarity }

    fn nearest<'a>(&'a self, vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<(ChunkId, f32)>>> {
        Box::pin(async move { Ok(self.search(vector, k)) })
    }

    fn populate<'a>(&'a self, chunks: &'a [Chunk]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let table: Vec<Entry> = chunks
                .iter()
                .map(|c| Entry { id: c.id.clone(), norm: norm(&c.embedding), vector: c.embedding.clone() })
                .collect();
            *self.entries.write() = Arc::new(table);
            tracing::debug!(rows = chunks.len(), "memory backend populated");
            Ok(())
        })
    }
}
