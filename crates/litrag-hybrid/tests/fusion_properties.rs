use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use litrag_core::config::{FusionConfig, Normalization};
use litrag_core::types::Candidate;
use litrag_hybrid::FusionEngine;

fn random_list(rng: &mut StdRng, lexical: bool) -> Vec<Candidate> {
    let n = rng.gen_range(0..12);
    (0..n)
        .map(|_| {
            let id = format!("c{}", rng.gen_range(0..15));
            if lexical { Candidate::lexical(id, rng.gen_range(0.0..25.0)) } else { Candidate::semantic(id, rng.gen_range(-1.0..1.0)) }
        })
        .collect()
}

fn engines(rng: &mut StdRng) -> Vec<FusionEngine> {
    let w: f32 = rng.gen_range(0.0..=1.0);
    [Normalization::MinMax, Normalization::ZScore]
        .into_iter()
        .map(|normalization| FusionEngine::new(FusionConfig { lexical_weight: w, semantic_weight: 1.0 - w, normalization }))
        .collect()
}

#[test]
fn fused_scores_stay_in_unit_interval() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..500 {
        let lexical = random_list(&mut rng, true);
        let semantic = random_list(&mut rng, false);
        for engine in engines(&mut rng) {
            for r in engine.fuse(&lexical, &semantic) {
                assert!(r.fused_score >= 0.0 && r.fused_score <= 1.0 + 1e-6, "{r:?} with {:?}", engine.config());
            }
        }
    }
}

#[test]
fn fusion_ignores_input_order() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..300 {
        let mut lexical = random_list(&mut rng, true);
        let mut semantic = random_list(&mut rng, false);
        for engine in engines(&mut rng) {
            let expected = engine.fuse(&lexical, &semantic);
            lexical.shuffle(&mut rng);
            semantic.shuffle(&mut rng);
            assert_eq!(engine.fuse(&lexical, &semantic), expected);
        }
    }
}

#[test]
fn output_covers_the_union_of_inputs_in_rank_order() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..200 {
        let lexical = random_list(&mut rng, true);
        let semantic = random_list(&mut rng, false);
        let out = FusionEngine::default().fuse(&lexical, &semantic);

        let mut expected: Vec<&str> = lexical.iter().chain(&semantic).map(|c| c.chunk_id.as_str()).collect();
        expected.sort();
        expected.dedup();
        let mut got: Vec<&str> = out.iter().map(|r| r.chunk_id.as_str()).collect();
        got.sort();
        assert_eq!(got, expected);

        for (i, pair) in out.windows(2).enumerate() {
            assert_eq!(pair[0].rank, i + 1);
            assert!(
                pair[0].fused_score > pair[1].fused_score
                    || (pair[0].fused_score == pair[1].fused_score && pair[0].chunk_id < pair[1].chunk_id)
            );
        }
    }
}
