//! Comparison of model outputs produced by different backends.

use fastrand_contrib::RngExt;
use rten_tensor::Tensor;
use rten_tensor::prelude::*;
use thiserror::Error;

/// Value added to the magnitude of the baseline value when computing the
/// relative difference, so that zeros in the baseline don't divide by zero.
pub const REL_EPSILON: f32 = 1e-8;

/// Errors that occur when comparing outputs.
#[derive(Debug, Error)]
pub enum CompareError {
    /// Backends returned outputs with different shapes for the same model.
    #[error("output {index} shape mismatch: {baseline:?} vs {candidate:?}")]
    ShapeMismatch {
        index: usize,
        baseline: Vec<usize>,
        candidate: Vec<usize>,
    },
}

/// Element-wise difference between a pair of outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DiffStats {
    /// Maximum of `|a - b|`.
    pub max_abs: f32,

    /// Maximum of `|a - b| / (|a| + REL_EPSILON)`, where `a` is the baseline
    /// value.
    pub max_rel: f32,
}

/// Like `f32::max`, but NaN in either argument gives NaN.
fn nan_max(acc: f32, x: f32) -> f32 {
    if acc.is_nan() || x.is_nan() {
        f32::NAN
    } else {
        acc.max(x)
    }
}

/// Compute the differences between a baseline and candidate output with the
/// same shape.
pub fn diff_stats(baseline: &Tensor<f32>, candidate: &Tensor<f32>) -> DiffStats {
    baseline
        .iter()
        .zip(candidate.iter())
        .fold(DiffStats::default(), |stats, (&a, &b)| {
            let abs = (a - b).abs();
            DiffStats {
                max_abs: nan_max(stats.max_abs, abs),
                max_rel: nan_max(stats.max_rel, abs / (a.abs() + REL_EPSILON)),
            }
        })
}

/// Compare the outputs of two backends pairwise, by position.
///
/// Returns the differences for each output, or an error for the first pair
/// of outputs whose shapes differ. If the backends returned a different
/// number of outputs, only the common prefix is compared.
pub fn compare_outputs(
    baseline: &[Tensor<f32>],
    candidate: &[Tensor<f32>],
) -> Result<Vec<DiffStats>, CompareError> {
    baseline
        .iter()
        .zip(candidate)
        .enumerate()
        .map(|(index, (a, b))| {
            if a.shape() != b.shape() {
                return Err(CompareError::ShapeMismatch {
                    index,
                    baseline: a.shape().to_vec(),
                    candidate: b.shape().to_vec(),
                });
            }
            Ok(diff_stats(a, b))
        })
        .collect()
}

/// Generate a tensor with values drawn from the standard normal distribution.
pub fn random_normal(rng: &mut fastrand::Rng, shape: &[usize]) -> Tensor<f32> {
    Tensor::from_simple_fn(shape, || rng.f32_normal(0., 1.))
}
