//! Okapi BM25 scoring over a built `LexicalIndex`.

use std::collections::HashMap;

use litrag_core::config::Bm25Params;
use litrag_core::types::{rank_order, Candidate};

use crate::index::LexicalIndex;

/// `ln(1 + (N - n + 0.5) / (n + 0.5))`, always positive.
pub fn idf(total_docs: usize, doc_freq: usize) -> f32 {
    let n = total_docs as f32;
    let df = doc_freq as f32;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}

/// Contribution of one term to one document.
pub fn term_score(params: Bm25Params, idf: f32, tf: u32, doc_len: u32, avg_doc_len: f32) -> f32 {
    let tf = tf as f32;
    let length_ratio = if avg_doc_len > 0.0 { doc_len as f32 / avg_doc_len } else { 0.0 };
    let denom = tf + params.k1 * (1.0 - params.b + params.b * length_ratio);
    idf * (tf * (params.k1 + 1.0)) / denom
}

impl LexicalIndex {
    /// Every chunk containing at least one query term, best first.
    ///
    /// Terms absent from the index contribute nothing; repeated terms count
    /// once per occurrence. An empty or fully unmatched query yields an empty
    /// list.
    pub fn score(&self, terms: &[String]) -> Vec<Candidate> {
        let mut scores: HashMap<u32, f32> = HashMap::new();
        for term in terms {
            let Some(postings) = self.postings.get(term) else { continue };
            let term_idf = idf(self.doc_ids.len(), postings.len());
            for posting in postings {
                let doc_len = self.doc_lengths[posting.doc as usize];
                *scores.entry(posting.doc).or_insert(0.0) += term_score(self.params, term_idf, posting.tf, doc_len, self.avg_doc_length);
            }
        }
        let mut ranked: Vec<Candidate> = scores
            .into_iter()
            .map(|(doc, score)| Candidate::lexical(self.doc_ids[doc as usize].clone(), score))
            .collect();
        ranked.sort_by(rank_order);
        ranked
    }

    pub fn search(&self, terms: &[String], limit: usize) -> Vec<Candidate> {
        let mut ranked = self.score(terms);
        ranked.truncate(limit);
        ranked
    }

    /// Tokenize `text` with the index analyzer, then `search`.
    pub fn search_text(&self, text: &str, limit: usize) -> Vec<Candidate> {
        self.search(&self.analyzer.tokenize(text), limit)
    }
}
