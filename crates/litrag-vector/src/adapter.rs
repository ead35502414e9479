use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use litrag_core::config::RetrievalConfig;
use litrag_core::traits::{EmbeddingProvider, ScoreKind, SimilarityBackend};
use litrag_core::types::{rank_order, Candidate, Chunk};
use litrag_core::{Error, Result};

/// Map a backend score onto "higher is more similar".
pub fn to_similarity(kind: ScoreKind, raw: f32) -> f32 {
    match kind {
        ScoreKind::Similarity => raw,
        ScoreKind::CosineDistance => 1.0 - raw,
        ScoreKind::Distance => -raw,
    }
}

/// Uniform query contract over an embedding provider and a similarity backend.
///
/// Every external call is bounded by its own timeout. Provider failures
/// surface as `EmbeddingUnavailable`, backend failures as `BackendUnavailable`.
#[derive(Clone)]
pub struct SimilarityIndex {
    provider: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn SimilarityBackend>,
    embed_timeout: Duration,
    backend_timeout: Duration,
}

async fn bounded<T, F>(call: F, limit: Duration, what: &str, fail: fn(String) -> Error) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(Error::Cancelled)) => Err(Error::Cancelled),
        Ok(Err(Error::EmbeddingUnavailable(msg) | Error::BackendUnavailable(msg))) => Err(fail(msg)),
        Ok(Err(e)) => Err(fail(e.to_string())),
        Err(_) => Err(fail(format!("{what} timed out after {}ms", limit.as_millis()))),
    }
}

impl SimilarityIndex {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, backend: Arc<dyn SimilarityBackend>, config: &RetrievalConfig) -> Self {
        Self::with_timeouts(provider, backend, config.embed_timeout(), config.backend_timeout())
    }

    pub fn with_timeouts(
        provider: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn SimilarityBackend>,
        embed_timeout: Duration,
        backend_timeout: Duration,
    ) -> Self {
        Self { provider, backend, embed_timeout, backend_timeout }
    }

    pub fn dim(&self) -> usize { self.provider.dim() }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let v = bounded(self.provider.embed(text), self.embed_timeout, "embedding", Error::EmbeddingUnavailable).await?;
        if v.len() != self.dim() {
            return Err(Error::EmbeddingUnavailable(format!("provider returned {} components, expected {}", v.len(), self.dim())));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(Error::EmbeddingUnavailable("provider returned non-finite components".into()));
        }
        Ok(v)
    }

    /// Up to `k` chunks nearest to `embedding`, most similar first, ties by id.
    pub async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<Candidate>> {
        if k == 0 { return Ok(Vec::new()); }
        let raw = bounded(self.backend.nearest(embedding, k), self.backend_timeout, "similarity search", Error::BackendUnavailable).await?;
        let kind = self.backend.score_kind();
        let mut candidates: Vec<Candidate> = raw
            .into_iter()
            .map(|(id, score)| Candidate::semantic(id, to_similarity(kind, score)))
            .filter(|c| !c.score.is_nan())
            .collect();
        candidates.sort_by(rank_order);
        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.chunk_id.clone()));
        candidates.truncate(k);
        Ok(candidates)
    }

    pub async fn search_text(&self, text: &str, k: usize) -> Result<Vec<Candidate>> {
        let embedding = self.embed_query(text).await?;
        self.search(&embedding, k).await
    }

    /// Replace backend contents. Not bounded by the query timeout.
    pub async fn populate(&self, chunks: &[Chunk]) -> Result<()> {
        match self.backend.populate(chunks).await {
            Ok(()) => Ok(()),
            Err(e @ (Error::MalformedChunk { .. } | Error::EmptyCorpus | Error::BackendUnavailable(_))) => Err(e),
            Err(e) => Err(Error::BackendUnavailable(e.to_string())),
        }
    }
}
