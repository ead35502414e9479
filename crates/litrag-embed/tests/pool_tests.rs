use candle_core::{DType, Device, Tensor};
use litrag_embed::masked_mean_l2;

#[test]
fn masked_mean_l2_basic() {
    let dev = Device::Cpu;
    // Two tokens with hidden dim 4; second token is masked out.
    let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0,
                                 5.0, 6.0, 7.0, 8.0],
                               (1, 2, 4), &dev).unwrap();
    let mask = Tensor::from_slice(&[1i64, 0i64], (1, 2), &dev).unwrap()
        .to_dtype(DType::F32).unwrap();
    let out = masked_mean_l2(&h, &mask).unwrap();
    let v: Vec<Vec<f32>> = out.to_vec2().unwrap();
    let v = &v[0];
    let norm: f32 = (1.0f32 * 1.0 + 2.0 * 2.0 + 3.0 * 3.0 + 4.0 * 4.0).sqrt();
    let expected = [1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm];
    for (a, b) in v.iter().cloned().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={} b={}", a, b);
    }
}

#[test]
fn masked_mean_l2_averages_unmasked_tokens() {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(&[1.0f32, 0.0, 3.0, 0.0, 9.0, 9.0], (1, 3, 2), &dev).unwrap();
    let mask = Tensor::from_slice(&[1f32, 1.0, 0.0], (1, 3), &dev).unwrap();
    let v: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    // mean of [1,0] and [3,0] is [2,0]; normalized to [1,0]
    assert!((v[0][0] - 1.0).abs() < 1e-5);
    assert!(v[0][1].abs() < 1e-5);
}

#[test]
fn fully_masked_row_pools_to_zero() {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(&[2.0f32, 4.0, 6.0, 8.0], (2, 1, 2), &dev).unwrap();
    let mask = Tensor::from_slice(&[1f32, 0.0], (2, 1), &dev).unwrap();
    let v: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    let first_norm = (v[0][0] * v[0][0] + v[0][1] * v[0][1]).sqrt();
    assert!((first_norm - 1.0).abs() < 1e-5);
    assert!(v[1].iter().all(|x| x.abs() < 1e-6), "{:?}", v[1]);
}

#[test]
fn mismatched_mask_is_an_error() {
    let dev = Device::Cpu;
    let h = Tensor::zeros((1, 3, 2), DType::F32, &dev).unwrap();
    let mask = Tensor::ones((1, 2), DType::F32, &dev).unwrap();
    assert!(masked_mean_l2(&h, &mask).is_err());
}
