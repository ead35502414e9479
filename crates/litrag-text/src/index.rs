use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use litrag_core::config::Bm25Params;
use litrag_core::types::{Chunk, ChunkId};
use litrag_core::{Error, Result};

use crate::analyzer::Analyzer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Posting {
    pub(crate) doc: u32,
    pub(crate) tf: u32,
}

/// Immutable BM25 statistics over one corpus generation.
///
/// Documents are numbered in chunk-id order, so the statistics do not depend
/// on the order chunks were supplied in.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    pub(crate) analyzer: Analyzer,
    pub(crate) params: Bm25Params,
    pub(crate) doc_ids: Vec<ChunkId>,
    pub(crate) doc_lengths: Vec<u32>,
    /// term -> postings sorted by doc number; `len()` is the document frequency.
    pub(crate) postings: HashMap<String, Vec<Posting>>,
    pub(crate) avg_doc_length: f32,
}

/// Order-independent view of the index statistics, comparable across builds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexicalStats {
    pub document_count: usize,
    pub average_document_length: f32,
    pub document_lengths: BTreeMap<ChunkId, u32>,
    pub document_frequencies: BTreeMap<String, usize>,
    pub term_frequencies: BTreeMap<ChunkId, BTreeMap<String, u32>>,
}

impl LexicalIndex {
    pub fn build(chunks: &[Chunk], analyzer: Analyzer, params: Bm25Params) -> Result<Self> {
        Self::build_from_texts(chunks.iter().map(|c| (c.id.as_str(), c.text.as_str())), analyzer, params)
    }

    pub fn build_from_texts<'a, I>(docs: I, analyzer: Analyzer, params: Bm25Params) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut docs: Vec<(&str, &str)> = docs.into_iter().collect();
        if docs.is_empty() { return Err(Error::EmptyCorpus); }
        docs.sort_by(|a, b| a.0.cmp(b.0));
        let mut seen = HashSet::with_capacity(docs.len());
        for (id, _) in &docs {
            if !seen.insert(*id) { return Err(Error::malformed(*id, "duplicate chunk id")); }
        }

        let mut doc_ids = Vec::with_capacity(docs.len());
        let mut doc_lengths = Vec::with_capacity(docs.len());
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut total_len: u64 = 0;
        for (doc_no, (id, text)) in docs.into_iter().enumerate() {
            let tokens = analyzer.tokenize(text);
            let mut tfs: BTreeMap<String, u32> = BTreeMap::new();
            for token in tokens.iter() { *tfs.entry(token.clone()).or_insert(0) += 1; }
            let doc = u32::try_from(doc_no).map_err(|_| Error::Operation("corpus exceeds u32 documents".into()))?;
            let doc_len = token_count(id, tokens.len())?;
            for (term, tf) in tfs { postings.entry(term).or_default().push(Posting { doc, tf }); }
            doc_ids.push(id.to_string());
            doc_lengths.push(doc_len);
            total_len += u64::from(doc_len);
        }
        let avg_doc_length = total_len as f32 / doc_ids.len() as f32;
        tracing::debug!(documents = doc_ids.len(), terms = postings.len(), avg_doc_length, "built lexical index");
        Ok(Self { analyzer, params, doc_ids, doc_lengths, postings, avg_doc_length })
    }

    pub fn analyzer(&self) -> &Analyzer { &self.analyzer }
    pub fn document_count(&self) -> usize { self.doc_ids.len() }
    pub fn term_count(&self) -> usize { self.postings.len() }
    pub fn average_document_length(&self) -> f32 { self.avg_doc_length }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }

    pub fn document_length(&self, chunk_id: &str) -> Option<u32> {
        self.doc_number(chunk_id).map(|n| self.doc_lengths[n])
    }

    pub fn term_frequency(&self, chunk_id: &str, term: &str) -> u32 {
        let Some(doc) = self.doc_number(chunk_id) else { return 0 };
        self.postings
            .get(term)
            .and_then(|p| p.binary_search_by_key(&(doc as u32), |posting| posting.doc).ok().map(|i| p[i].tf))
            .unwrap_or(0)
    }

    pub fn stats(&self) -> LexicalStats {
        let mut term_frequencies: BTreeMap<ChunkId, BTreeMap<String, u32>> =
            self.doc_ids.iter().map(|id| (id.clone(), BTreeMap::new())).collect();
        let mut document_frequencies = BTreeMap::new();
        for (term, list) in &self.postings {
            document_frequencies.insert(term.clone(), list.len());
            for posting in list {
                if let Some(tfs) = term_frequencies.get_mut(&self.doc_ids[posting.doc as usize]) {
                    tfs.insert(term.clone(), posting.tf);
                }
            }
        }
        LexicalStats {
            document_count: self.doc_ids.len(),
            average_document_length: self.avg_doc_length,
            document_lengths: self.doc_ids.iter().cloned().zip(self.doc_lengths.iter().copied()).collect(),
            document_frequencies,
            term_frequencies,
        }
    }

    fn doc_number(&self, chunk_id: &str) -> Option<usize> {
        self.doc_ids.binary_search_by(|id| id.as_str().cmp(chunk_id)).ok()
    }
}

fn token_count(chunk_id: &str, tokens: usize) -> Result<u32> {
    u32::try_from(tokens).map_err(|_| Error::malformed(chunk_id, format!("{tokens} tokens exceed the u32 document length")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_token_count_is_rejected() {
        assert_eq!(token_count("c1", 7).unwrap(), 7);
        let err = token_count("c1", u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, Error::MalformedChunk { .. }));
    }

    fn build(docs: &[(&str, &str)]) -> LexicalIndex {
        LexicalIndex::build_from_texts(docs.iter().copied(), Analyzer::default(), Bm25Params::default()).expect("build")
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let err = LexicalIndex::build_from_texts(Vec::new(), Analyzer::default(), Bm25Params::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = LexicalIndex::build_from_texts(vec![("a", "sepsis"), ("a", "lactate")], Analyzer::default(), Bm25Params::default())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedChunk { .. }));
    }

    #[test]
    fn statistics_are_consistent() {
        let idx = build(&[("c1", "sepsis lactate sepsis"), ("c2", "lactate clearance"), ("c3", "the and of")]);
        assert_eq!(idx.document_count(), 3);
        assert_eq!(idx.document_frequency("lactate"), 2);
        assert_eq!(idx.document_frequency("sepsis"), 1);
        assert_eq!(idx.document_frequency("missing"), 0);
        assert_eq!(idx.term_frequency("c1", "sepsis"), 2);
        assert_eq!(idx.term_frequency("c2", "sepsis"), 0);
        assert_eq!(idx.document_length("c1"), Some(3));
        assert_eq!(idx.document_length("c3"), Some(0));
        assert!((idx.average_document_length() - 5.0 / 3.0).abs() < 1e-6);

        let stats = idx.stats();
        let summed: u32 = stats.term_frequencies.values().flat_map(|m| m.values()).sum();
        let lengths: u32 = stats.document_lengths.values().sum();
        assert_eq!(summed, lengths, "term frequencies add up to document lengths");
    }

    #[test]
    fn statistics_do_not_depend_on_input_order() {
        let a = build(&[("c1", "sepsis lactate"), ("c2", "lactate clearance"), ("c3", "procalcitonin")]);
        let b = build(&[("c3", "procalcitonin"), ("c1", "sepsis lactate"), ("c2", "lactate clearance")]);
        assert_eq!(a.stats(), b.stats());
    }
}
