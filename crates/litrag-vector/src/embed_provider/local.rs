use futures::future::BoxFuture;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

use litrag_core::traits::{Embedder, EmbeddingProvider};
use litrag_core::{Error, Result};
use litrag_embed::get_default_embedder;

const DEFAULT_CONCURRENCY: usize = 2;

/// Runs a synchronous `Embedder` on the blocking thread pool.
///
/// At most `concurrency` model calls run at once. A call abandoned by a
/// timeout or cancellation keeps its permit until the model returns, so
/// later callers wait instead of stacking blocking threads.
pub struct LocalProvider {
    inner: Arc<dyn Embedder>,
    permits: Arc<Semaphore>,
    id: String,
}

impl LocalProvider {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        let id = format!("local:d{}", inner.dim());
        Self { inner, permits: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)), id }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(concurrency.max(1)));
        self
    }

    /// Loads the default embedder (honors `APP_USE_FAKE_EMBEDDINGS=1`).
    pub fn from_env(dim: usize, model_dir: Option<&Path>) -> Result<Self> {
        let inner = get_default_embedder(dim, model_dir).map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
        Ok(Self::new(Arc::from(inner)))
    }

    pub fn embedder_id(&self) -> &str { &self.id }
}

impl EmbeddingProvider for LocalProvider {
    fn dim(&self) -> usize { self.inner.dim() }

    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        let permits = Arc::clone(&self.permits);
        let text = text.to_string();
        Box::pin(async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| Error::EmbeddingUnavailable(format!("embedder closed: {e}")))?;
            let mut vectors = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                inner.embed_batch(&[text])
            })
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("embedding task failed: {e}")))?
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
            vectors.pop().ok_or_else(|| Error::EmbeddingUnavailable("embedder returned no vector".into()))
        })
    }
}
