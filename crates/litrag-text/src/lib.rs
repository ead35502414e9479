//! litrag-text
//!
//! Keyword side of hybrid retrieval: a deterministic analyzer built from
//! tantivy's tokenizer pipeline and an in-memory Okapi BM25 index over chunks.

pub mod analyzer;
pub mod index;
pub mod search;

pub use analyzer::Analyzer;
pub use index::{LexicalIndex, LexicalStats};
