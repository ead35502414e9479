//! Domain types shared by the lexical, semantic and fusion stages.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type ChunkId = String;

/// A chunk of a source document that is independently indexed.
///
/// - `id`: globally unique, stable chunk identifier
/// - `doc_id`: identity of the source document (file stem or external id)
/// - `title`: source document title, used for provenance
/// - `authors`, `journal`, `year`: bibliographic metadata when it was found
/// - `doc_path`: original path of the source document
/// - `text`: the text payload; immutable once indexed
/// - `chunk_index`: position within the parent document
/// - `embedding`: fixed-dimensionality vector for `text`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    pub doc_path: String,
    pub text: String,
    pub chunk_index: usize,
    pub embedding: Vec<f32>,
}

/// Indicates which retrieval method produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Lexical,
    Semantic,
}

/// One entry of a per-source ranked list.
///
/// `score` is on the source's own scale (BM25 or similarity); higher is
/// always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

impl Candidate {
    pub fn lexical(chunk_id: impl Into<ChunkId>, score: f32) -> Self {
        Self { chunk_id: chunk_id.into(), score, source: SourceKind::Lexical }
    }

    pub fn semantic(chunk_id: impl Into<ChunkId>, score: f32) -> Self {
        Self { chunk_id: chunk_id.into(), score, source: SourceKind::Semantic }
    }
}

/// Descending by score, ties by chunk id ascending.
pub fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

/// Raw and normalized score a single source contributed to a fused result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceScore {
    pub raw: f32,
    pub normalized: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub chunk_id: ChunkId,
    pub fused_score: f32,
    pub lexical: Option<SourceScore>,
    pub semantic: Option<SourceScore>,
    /// 1-based position in the fused ranking.
    pub rank: usize,
}

/// A query after tokenization. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    terms: Vec<String>,
    k: usize,
}

impl Query {
    pub fn new(text: impl Into<String>, terms: Vec<String>, k: usize) -> Self {
        Self { text: text.into(), terms, k }
    }

    pub fn text(&self) -> &str { &self.text }
    pub fn terms(&self) -> &[String] { &self.terms }
    pub fn k(&self) -> usize { self.k }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_serializes_snake_case() {
        let json = serde_json::to_string(&SourceKind::Semantic).expect("serialize");
        assert_eq!(json, "\"semantic\"");
    }
}
