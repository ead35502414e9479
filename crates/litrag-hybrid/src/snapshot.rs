use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use litrag_core::types::{Chunk, ChunkId};
use litrag_text::LexicalIndex;

/// One published index generation: the lexical index plus the corpus it was
/// built from. Never mutated after construction; rebuilds publish a new one.
#[derive(Debug)]
pub struct IndexSnapshot {
    generation: u64,
    built_at: DateTime<Utc>,
    lexical: LexicalIndex,
    chunks: HashMap<ChunkId, Chunk>,
    document_count: usize,
}

impl IndexSnapshot {
    pub fn new(generation: u64, lexical: LexicalIndex, chunks: Vec<Chunk>) -> Self {
        let document_count = chunks.iter().map(|c| c.doc_id.as_str()).collect::<HashSet<_>>().len();
        let chunks = chunks.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self { generation, built_at: Utc::now(), lexical, chunks, document_count }
    }

    pub fn generation(&self) -> u64 { self.generation }
    pub fn built_at(&self) -> DateTime<Utc> { self.built_at }
    pub fn lexical(&self) -> &LexicalIndex { &self.lexical }
    pub fn chunk(&self, id: &str) -> Option<&Chunk> { self.chunks.get(id) }
    pub fn contains(&self, id: &str) -> bool { self.chunks.contains_key(id) }
    pub fn chunk_count(&self) -> usize { self.chunks.len() }
    pub fn document_count(&self) -> usize { self.document_count }
}
