//! Hybrid retrieval: BM25 and vector similarity fused into one ranking.

pub mod fusion;
pub mod ingest;
pub mod response;
pub mod retriever;
pub mod snapshot;

pub use fusion::FusionEngine;
pub use ingest::{embed_document_chunks, ingest_directory, IngestOptions};
pub use response::{Degradation, DegradationKind, Passage, Retrieval, RetrievalMode, RetrieverStats};
pub use retriever::{validate_chunks, HybridRetriever, SearchOutcome};
pub use snapshot::IndexSnapshot;
