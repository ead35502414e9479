//! Embedding models behind the synchronous `Embedder` trait.

use anyhow::Result;
use std::path::Path;

pub mod device;
pub mod hash;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use litrag_core::traits::Embedder;
pub use model::EmbeddingModel;
pub use pool::masked_mean_l2;

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The hash embedder when fake embeddings are requested, otherwise the local model.
pub fn get_default_embedder(dim: usize, model_dir: Option<&Path>) -> Result<Box<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!(dim, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(dim)));
    }
    Ok(Box::new(EmbeddingModel::load(model_dir)?))
}
