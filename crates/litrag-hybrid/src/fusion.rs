//! Score fusion: per-list normalization followed by a weighted sum.
//!
//! Pure and stateless. The output depends only on the multiset of
//! `(chunk id, score)` pairs in each input, never on their order.

use std::collections::{BTreeMap, HashMap};

use litrag_core::config::{FusionConfig, Normalization};
use litrag_core::types::{Candidate, ChunkId, FusedResult, SourceScore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionEngine {
    config: FusionConfig,
}

/// Collapse repeated ids to their best raw score, dropping non-finite scores.
fn best_scores(candidates: &[Candidate]) -> BTreeMap<&str, f32> {
    let mut best: BTreeMap<&str, f32> = BTreeMap::new();
    for c in candidates.iter().filter(|c| c.score.is_finite()) {
        best.entry(c.chunk_id.as_str()).and_modify(|s| *s = s.max(c.score)).or_insert(c.score);
    }
    best
}

fn min_max(scores: &BTreeMap<&str, f32>) -> impl Fn(f32) -> f32 {
    let min = scores.values().copied().fold(f32::INFINITY, f32::min);
    let max = scores.values().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    move |s| if range > 0.0 { ((s - min) / range).clamp(0.0, 1.0) } else { 1.0 }
}

fn z_score(scores: &BTreeMap<&str, f32>) -> impl Fn(f32) -> f32 {
    let n = scores.len() as f64;
    let mean = scores.values().map(|&s| s as f64).sum::<f64>() / n;
    let variance = scores.values().map(|&s| (s as f64 - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    move |s| {
        if std_dev > 0.0 {
            let z = (s as f64 - mean) / std_dev;
            (1.0 / (1.0 + (-z).exp())) as f32
        } else {
            1.0
        }
    }
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self { Self { config } }

    pub fn config(&self) -> &FusionConfig { &self.config }

    /// Normalize one result list into [0, 1], keyed by chunk id.
    pub fn normalize(&self, candidates: &[Candidate]) -> HashMap<ChunkId, SourceScore> {
        let best = best_scores(candidates);
        if best.is_empty() { return HashMap::new(); }
        let scale: Box<dyn Fn(f32) -> f32> = match self.config.normalization {
            Normalization::MinMax => Box::new(min_max(&best)),
            Normalization::ZScore => Box::new(z_score(&best)),
        };
        best.iter()
            .map(|(id, &raw)| (id.to_string(), SourceScore { raw, normalized: scale(raw) }))
            .collect()
    }

    /// Union of both lists, best fused score first, ties by chunk id, ranked from 1.
    pub fn fuse(&self, lexical: &[Candidate], semantic: &[Candidate]) -> Vec<FusedResult> {
        let mut lex = self.normalize(lexical);
        let mut sem = self.normalize(semantic);
        let mut ids: Vec<ChunkId> = lex.keys().chain(sem.keys()).cloned().collect();
        ids.sort();
        ids.dedup();

        let FusionConfig { lexical_weight, semantic_weight, .. } = self.config;
        let mut fused: Vec<FusedResult> = ids
            .into_iter()
            .map(|id| {
                let lexical = lex.remove(&id);
                let semantic = sem.remove(&id);
                let fused_score = lexical_weight * lexical.map_or(0.0, |s| s.normalized)
                    + semantic_weight * semantic.map_or(0.0, |s| s.normalized);
                FusedResult { chunk_id: id, fused_score, lexical, semantic, rank: 0 }
            })
            .collect();
        fused.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score).then_with(|| a.chunk_id.cmp(&b.chunk_id)));
        for (i, r) in fused.iter_mut().enumerate() { r.rank = i + 1; }
        fused
    }
}

impl Default for FusionEngine {
    fn default() -> Self { Self::new(FusionConfig::default()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(items: &[(&str, f32)]) -> Vec<Candidate> { items.iter().map(|(id, s)| Candidate::lexical(*id, *s)).collect() }
    fn sem(items: &[(&str, f32)]) -> Vec<Candidate> { items.iter().map(|(id, s)| Candidate::semantic(*id, *s)).collect() }

    #[test]
    fn opposite_preferences_follow_the_weights() {
        let engine = FusionEngine::default();
        let out = engine.fuse(&lex(&[("A", 12.0), ("B", 3.0)]), &sem(&[("A", 0.1), ("B", 0.9)]));
        assert_eq!(out[0].chunk_id, "B");
        assert!((out[0].fused_score - 0.7).abs() < 1e-6);
        assert_eq!(out[1].chunk_id, "A");
        assert!((out[1].fused_score - 0.3).abs() < 1e-6);
        assert_eq!((out[0].rank, out[1].rank), (1, 2));
    }

    #[test]
    fn constant_list_normalizes_to_one() {
        let engine = FusionEngine::default();
        let n = engine.normalize(&lex(&[("a", 2.5), ("b", 2.5)]));
        assert!(n.values().all(|s| s.normalized == 1.0));
        assert!(engine.normalize(&[]).is_empty());
    }

    #[test]
    fn missing_source_contributes_zero() {
        let engine = FusionEngine::default();
        let out = engine.fuse(&lex(&[("only-lex", 4.0)]), &sem(&[("only-sem", 0.8)]));
        let by_id: HashMap<_, _> = out.iter().map(|r| (r.chunk_id.as_str(), r)).collect();
        assert!((by_id["only-lex"].fused_score - 0.3).abs() < 1e-6);
        assert!(by_id["only-lex"].semantic.is_none());
        assert!((by_id["only-sem"].fused_score - 0.7).abs() < 1e-6);
        assert_eq!(out[0].chunk_id, "only-sem");
    }

    #[test]
    fn duplicate_ids_keep_best_score() {
        let engine = FusionEngine::default();
        let n = engine.normalize(&sem(&[("a", 0.2), ("a", 0.9), ("b", 0.5)]));
        assert_eq!(n["a"].raw, 0.9);
        assert_eq!(n["a"].normalized, 1.0);
        assert_eq!(n["b"].normalized, 0.0);
    }

    #[test]
    fn equal_fused_scores_break_by_id() {
        let engine = FusionEngine::default();
        let out = engine.fuse(&lex(&[("z", 1.0), ("m", 1.0)]), &[]);
        let ids: Vec<_> = out.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["m", "z"]);
    }

    #[test]
    fn z_score_stays_in_unit_interval() {
        let engine = FusionEngine::new(FusionConfig { normalization: Normalization::ZScore, ..FusionConfig::default() });
        let n = engine.normalize(&lex(&[("a", 1.0), ("b", 2.0), ("c", 30.0)]));
        assert!(n.values().all(|s| (0.0..=1.0).contains(&s.normalized)));
        assert!(n["c"].normalized > n["b"].normalized && n["b"].normalized > n["a"].normalized);
        let flat = engine.normalize(&lex(&[("a", 3.0), ("b", 3.0)]));
        assert!(flat.values().all(|s| s.normalized == 1.0));
    }
}
