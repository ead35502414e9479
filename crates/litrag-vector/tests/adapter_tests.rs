use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

use litrag_core::traits::{EmbeddingProvider, ScoreKind, SimilarityBackend};
use litrag_core::types::{Chunk, ChunkId};
use litrag_core::{Error, Result};
use litrag_vector::{to_similarity, SimilarityIndex};

struct FixedProvider { vector: Vec<f32>, delay: Duration }

impl EmbeddingProvider for FixedProvider {
    fn dim(&self) -> usize { 2 }
    fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(self.vector.clone())
        })
    }
}

struct ScriptedBackend { kind: ScoreKind, hits: Vec<(ChunkId, f32)>, delay: Duration, fail: bool }

impl SimilarityBackend for ScriptedBackend {
    fn score_kind(&self) -> ScoreKind { self.kind }
    fn nearest<'a>(&'a self, _vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<(ChunkId, f32)>>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            if self.fail { return Err(Error::Operation("connection refused".into())); }
            Ok(self.hits.iter().take(k).cloned().collect())
        })
    }
    fn populate<'a>(&'a self, _chunks: &'a [Chunk]) -> BoxFuture<'a, Result<()>> { Box::pin(async { Ok(()) }) }
}

fn provider(delay_ms: u64) -> Arc<dyn EmbeddingProvider> {
    Arc::new(FixedProvider { vector: vec![1.0, 0.0], delay: Duration::from_millis(delay_ms) })
}

fn backend(kind: ScoreKind, hits: &[(&str, f32)], delay_ms: u64, fail: bool) -> Arc<dyn SimilarityBackend> {
    Arc::new(ScriptedBackend {
        kind,
        hits: hits.iter().map(|(id, s)| (id.to_string(), *s)).collect(),
        delay: Duration::from_millis(delay_ms),
        fail,
    })
}

fn index(provider: Arc<dyn EmbeddingProvider>, backend: Arc<dyn SimilarityBackend>) -> SimilarityIndex {
    SimilarityIndex::with_timeouts(provider, backend, Duration::from_millis(100), Duration::from_millis(100))
}

#[test]
fn distances_are_inverted() {
    assert_eq!(to_similarity(ScoreKind::Similarity, 0.4), 0.4);
    assert!((to_similarity(ScoreKind::CosineDistance, 0.25) - 0.75).abs() < 1e-6);
    assert_eq!(to_similarity(ScoreKind::Distance, 3.0), -3.0);
}

#[tokio::test]
async fn cosine_distances_become_descending_similarities() {
    let idx = index(provider(0), backend(ScoreKind::CosineDistance, &[("near", 0.1), ("far", 0.9), ("mid", 0.5)], 0, false));
    let hits = idx.search_text("sepsis", 10).await.unwrap();
    let ids: Vec<_> = hits.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["near", "mid", "far"]);
    assert!((hits[0].score - 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn ties_break_by_id_and_duplicates_collapse() {
    let idx = index(provider(0), backend(ScoreKind::Similarity, &[("b", 0.5), ("a", 0.5), ("b", 0.2), ("c", f32::NAN)], 0, false));
    let hits = idx.search(&[1.0, 0.0], 10).await.unwrap();
    let ids: Vec<_> = hits.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn slow_provider_times_out_as_embedding_unavailable() {
    let idx = index(provider(2_000), backend(ScoreKind::Similarity, &[("a", 1.0)], 0, false));
    let started = Instant::now();
    let err = idx.search_text("sepsis", 5).await.unwrap_err();
    assert!(matches!(err, Error::EmbeddingUnavailable(_)), "{err}");
    assert!(started.elapsed() < Duration::from_millis(1_000));
}

#[tokio::test]
async fn slow_backend_times_out_as_backend_unavailable() {
    let idx = index(provider(0), backend(ScoreKind::Similarity, &[("a", 1.0)], 2_000, false));
    let err = idx.search_text("sepsis", 5).await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(_)), "{err}");
}

#[tokio::test]
async fn backend_errors_are_reported_as_backend_unavailable() {
    let idx = index(provider(0), backend(ScoreKind::Similarity, &[], 0, true));
    let err = idx.search(&[1.0, 0.0], 5).await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(ref m) if m.contains("connection refused")), "{err}");
}

#[tokio::test]
async fn wrong_dimension_is_embedding_unavailable() {
    let p: Arc<dyn EmbeddingProvider> = Arc::new(FixedProvider { vector: vec![1.0, 0.0, 0.0], delay: Duration::ZERO });
    let idx = index(p, backend(ScoreKind::Similarity, &[], 0, false));
    assert!(matches!(idx.embed_query("x").await.unwrap_err(), Error::EmbeddingUnavailable(_)));
}

#[tokio::test]
async fn zero_k_skips_backend() {
    let idx = index(provider(0), backend(ScoreKind::Similarity, &[("a", 1.0)], 0, true));
    assert!(idx.search(&[1.0, 0.0], 0).await.unwrap().is_empty());
}
