//! Similarity Index Adapter and the vector backends behind it.

pub mod adapter;
pub mod embed_provider;
pub mod lance;
pub mod memory;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use adapter::{to_similarity, SimilarityIndex};
pub use embed_provider::LocalProvider;
pub use lance::LanceBackend;
pub use memory::MemoryBackend;

pub(crate) fn unavailable(e: impl std::fmt::Display) -> litrag_core::Error {
    litrag_core::Error::BackendUnavailable(e.to_string())
}
