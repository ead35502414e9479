use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use litrag_core::types::{Chunk, FusedResult};
use litrag_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    Hybrid,
    LexicalOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    EmbeddingUnavailable,
    BackendUnavailable,
}

/// Why a query fell back to lexical-only retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degradation {
    pub kind: DegradationKind,
    pub message: String,
}

impl Degradation {
    /// `None` for errors that are not a degraded-mode trigger.
    pub fn from_error(err: &Error) -> Option<Self> {
        if !err.is_transient() { return None; }
        let kind = match err {
            Error::EmbeddingUnavailable(_) => DegradationKind::EmbeddingUnavailable,
            _ => DegradationKind::BackendUnavailable,
        };
        Some(Self { kind, message: err.to_string() })
    }
}

/// A fused result resolved back to its chunk for provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    #[serde(flatten)]
    pub result: FusedResult,
    pub doc_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    pub doc_path: String,
    pub chunk_index: usize,
    pub text: String,
    pub degraded: bool,
}

impl Passage {
    pub fn new(result: FusedResult, chunk: &Chunk, degraded: bool) -> Self {
        Self {
            result,
            doc_id: chunk.doc_id.clone(),
            title: chunk.title.clone(),
            authors: chunk.authors.clone(),
            journal: chunk.journal.clone(),
            year: chunk.year,
            doc_path: chunk.doc_path.clone(),
            chunk_index: chunk.chunk_index,
            text: chunk.text.clone(),
            degraded,
        }
    }

    pub fn chunk_id(&self) -> &str { &self.result.chunk_id }
    pub fn score(&self) -> f32 { self.result.fused_score }
    pub fn rank(&self) -> usize { self.result.rank }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub passages: Vec<Passage>,
    pub mode: RetrievalMode,
    pub degradation: Option<Degradation>,
    pub generation: u64,
    pub elapsed: Duration,
    /// Semantic candidates dropped because the snapshot cannot resolve them.
    pub dropped_stale: usize,
}

impl Retrieval {
    pub fn empty(generation: u64, elapsed: Duration) -> Self {
        Self { passages: Vec::new(), mode: RetrievalMode::Hybrid, degradation: None, generation, elapsed, dropped_stale: 0 }
    }

    pub fn is_degraded(&self) -> bool { self.mode == RetrievalMode::LexicalOnly }
    pub fn is_empty(&self) -> bool { self.passages.is_empty() }
    pub fn len(&self) -> usize { self.passages.len() }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrieverStats {
    pub document_count: usize,
    pub chunk_count: usize,
    pub index_generation: u64,
    pub last_build: Option<DateTime<Utc>>,
    pub term_count: usize,
    pub average_chunk_length: f32,
}
