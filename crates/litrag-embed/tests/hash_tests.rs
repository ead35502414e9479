use litrag_embed::{get_default_embedder, Embedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = HashEmbedder::new(768);
    let texts = vec!["lactate clearance".to_string(), "lactate clearance".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 2);
    assert_eq!(embs[0].len(), 768);
    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    assert_eq!(embs[0], embs[1]);
}

#[test]
fn shared_words_are_closer_than_disjoint_ones() {
    let e = HashEmbedder::new(256);
    let q = e.embed_text("Sepsis biomarker");
    let near = e.embed_text("a sepsis biomarker panel");
    let far = e.embed_text("orthopedic surgery outcomes");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn empty_text_is_zero_vector() {
    let v = HashEmbedder::new(16).embed_text("  ...  ");
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn fake_flag_selects_hash_embedder() {
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    let embedder = get_default_embedder(64, None).expect("embedder");
    assert_eq!(embedder.dim(), 64);
    let v = embedder.embed_batch(&["procalcitonin".to_string()]).expect("embed");
    assert_eq!(v[0].len(), 64);
}
