//! Quantization of bounded floats into the masking group.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use num::clamp;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Checks whether the ranges admit a non-degenerate quantization.
fn is_degenerate(clipping_range: f64, target_range: u32) -> bool {
    !(clipping_range > 0.0 && clipping_range.is_finite()) || target_range == 0
}

/// Quantizes the `values` to integers in `[0, target_range]`.
///
/// Each value is clipped to `[-clipping_range, clipping_range]`, shifted to
/// `[0, 2 * clipping_range]` and scaled by `target_range / (2 * clipping_range)`. The scaled value
/// `v` is then rounded stochastically to `floor(v) + 1` with probability `v - floor(v)` and to
/// `floor(v)` otherwise, which keeps the expected quantization error at zero. `NaN`s are treated
/// as zero. The randomness is drawn from a `ChaCha20` PRNG seeded from the system entropy.
///
/// A non-positive clipping range or a zero target range yields zeros.
pub fn quantize(values: &[f64], clipping_range: f64, target_range: u32) -> Vec<u32> {
    let mut prng = ChaCha20Rng::from_entropy();
    quantize_with_rng(&mut prng, values, clipping_range, target_range)
}

/// Quantizes the `values` like [`quantize()`], with the rounding decisions drawn from the given
/// `prng`.
pub fn quantize_with_rng<R: Rng + ?Sized>(
    prng: &mut R,
    values: &[f64],
    clipping_range: f64,
    target_range: u32,
) -> Vec<u32> {
    if is_degenerate(clipping_range, target_range) {
        return vec![0; values.len()];
    }

    let scale = f64::from(target_range) / (2.0 * clipping_range);
    values
        .iter()
        .map(|value| {
            let value = if value.is_nan() { 0.0 } else { *value };
            let clipped = clamp(value, -clipping_range, clipping_range);
            let scaled = (clipped + clipping_range) * scale;
            let floor = scaled.floor();
            let rounded = if prng.gen::<f64>() < scaled - floor {
                floor + 1.0
            } else {
                floor
            };
            // the cast saturates, the upper end guards against floating point overshoot
            (rounded as u64).min(u64::from(target_range)) as u32
        })
        .collect()
}

/// Maps quantized integers back to floats as `integer * (2 * clipping_range / target_range) -
/// clipping_range`.
///
/// A non-positive clipping range or a zero target range yields zeros.
pub fn dequantize(integers: &[u32], clipping_range: f64, target_range: u32) -> Vec<f64> {
    dequantize_sum(integers, clipping_range, target_range, 1)
}

/// Maps the sum of `count` quantized vectors back to the sum of the float vectors as
/// `integer * (2 * clipping_range / target_range) - count * clipping_range`.
///
/// The sum must not have wrapped around the masking group, i.e. `count * target_range` must be
/// smaller than the mask range.
pub fn dequantize_sum(
    integers: &[u32],
    clipping_range: f64,
    target_range: u32,
    count: usize,
) -> Vec<f64> {
    if is_degenerate(clipping_range, target_range) {
        return vec![0.0; integers.len()];
    }

    let step = 2.0 * clipping_range / f64::from(target_range);
    let shift = count as f64 * clipping_range;
    integers
        .iter()
        .map(|integer| f64::from(*integer) * step - shift)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prng() -> ChaCha20Rng {
        ChaCha20Rng::from_seed([0_u8; 32])
    }

    #[test]
    fn test_bounds() {
        let quantized = quantize(&[-10.0, -3.0, 0.0, 3.0, 10.0, f64::NAN], 3.0, 1 << 16);
        assert_eq!(quantized[0], 0);
        assert_eq!(quantized[1], 0);
        assert_eq!(quantized[2], 1 << 15);
        assert_eq!(quantized[3], 1 << 16);
        assert_eq!(quantized[4], 1 << 16);
        assert_eq!(quantized[5], 1 << 15);
    }

    #[test]
    fn test_round_trip_bound() {
        let (clipping_range, target_range) = (3.0, 1000);
        let step = 2.0 * clipping_range / f64::from(target_range);
        let values = (0..=600).map(|i| -3.0 + 0.01 * f64::from(i)).collect::<Vec<_>>();
        let quantized = quantize_with_rng(&mut prng(), &values, clipping_range, target_range);
        let dequantized = dequantize(&quantized, clipping_range, target_range);
        for (value, approx) in values.iter().zip(dequantized) {
            assert!((value - approx).abs() <= step + 1e-9);
        }
    }

    #[test]
    fn test_unbiased() {
        let (clipping_range, target_range) = (1.0, 16);
        let value = 0.123;
        let values = vec![value; 10_000];
        let quantized = quantize_with_rng(&mut prng(), &values, clipping_range, target_range);
        // only the two neighbouring grid points occur
        assert!(quantized.iter().all(|q| *q == 8 || *q == 9));
        let mean = dequantize(&quantized, clipping_range, target_range)
            .iter()
            .sum::<f64>()
            / values.len() as f64;
        assert!((mean - value).abs() < 0.005);
    }

    #[test]
    fn test_exact_grid_points() {
        // values on the grid are never rounded
        let quantized = quantize_with_rng(&mut prng(), &[-1.0, -0.5, 0.25, 1.0], 1.0, 8);
        assert_eq!(quantized, vec![0, 2, 5, 8]);
        assert_eq!(dequantize(&quantized, 1.0, 8), vec![-1.0, -0.5, 0.25, 1.0]);
    }

    #[test]
    fn test_degenerate() {
        assert_eq!(quantize(&[1.0, -1.0], 0.0, 100), vec![0, 0]);
        assert_eq!(quantize(&[1.0, -1.0], 1.0, 0), vec![0, 0]);
        assert_eq!(quantize(&[1.0], -1.0, 100), vec![0]);
        assert_eq!(dequantize(&[5, 7], 0.0, 100), vec![0.0, 0.0]);
        assert_eq!(dequantize(&[5, 7], 1.0, 0), vec![0.0, 0.0]);
        assert!(quantize(&[], 1.0, 100).is_empty());
    }

    #[test]
    fn test_dequantize_sum() {
        let (clipping_range, target_range) = (2.0, 4);
        let a = quantize(&[-2.0, 1.0], clipping_range, target_range);
        let b = quantize(&[2.0, 1.0], clipping_range, target_range);
        let sum = a.iter().zip(&b).map(|(a, b)| a + b).collect::<Vec<_>>();
        assert_eq!(
            dequantize_sum(&sum, clipping_range, target_range, 2),
            vec![0.0, 2.0]
        );
    }
}
