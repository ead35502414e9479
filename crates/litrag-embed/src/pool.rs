use anyhow::{bail, Context, Result};
use candle_core::{DType, Tensor, D};

const NORM_EPS: f64 = 1e-12;

/// Sentence embedding from token states: mean over the tokens the attention
/// mask keeps, then L2 normalization. Takes `[B, T, H]` states and a `[B, T]`
/// mask and returns `[B, H]` in `f32`.
///
/// Rows whose mask is all zero come back as zero vectors.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, tokens, hidden_dim) = hidden.dims3().context("token states must be [batch, tokens, hidden]")?;
    if attention_mask.dims() != [batch, tokens] {
        bail!("attention mask is {:?}, expected [{batch}, {tokens}]", attention_mask.dims());
    }

    let states = hidden.to_dtype(DType::F32)?;
    let weights = attention_mask.to_device(states.device())?.to_dtype(DType::F32)?;
    let kept = weights.sum_keepdim(1)?.clamp(1.0f32, f32::MAX)?;
    let summed = states.broadcast_mul(&weights.unsqueeze(D::Minus1)?)?.sum(1)?;
    let mean = summed.broadcast_div(&kept)?;

    let norm = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + NORM_EPS)?;
    let pooled = mean.broadcast_div(&norm)?;
    debug_assert_eq!(pooled.dims(), [batch, hidden_dim]);
    Ok(pooled)
}
