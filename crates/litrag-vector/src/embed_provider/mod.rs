//! Embedding providers consumed by the similarity adapter and ingestion.
//!
//! Providers return vectors of exactly `dim()` components and report every
//! failure as `Error::EmbeddingUnavailable`.

pub mod local;

pub use local::LocalProvider;
