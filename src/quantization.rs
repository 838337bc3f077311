//! Scalar quantization of BFU coefficients
//!
//! Each BFU shares one scale factor from the 64-entry log-spaced table and
//! one word length. Quantization maps coefficients onto the symmetric
//! integer range of the word length with saturation; a scale-factor or
//! word-length index of zero mutes the BFU entirely.

use crate::tables::{SCALE_FACTORS, WORD_LENGTH_BITS};

/// Smallest scale-factor index whose table value covers `max|coef|`.
///
/// Returns 0 for an all-zero (or vanishingly small) BFU, which by
/// convention mutes it on both the encode and decode paths.
pub fn scale_factor_index(coefficients: &[f32]) -> usize {
    let max = coefficients.iter().fold(0.0f32, |m, c| m.max(c.abs())) as f64;
    if max <= 0.0 {
        return 0;
    }
    SCALE_FACTORS
        .iter()
        .position(|&sf| sf >= max)
        .unwrap_or(SCALE_FACTORS.len() - 1)
}

/// Quantize one BFU's coefficients at the given scale factor and word length.
///
/// Values saturate at the two's-complement range of the word length, so a
/// coefficient slightly above the scale factor cannot overflow its field.
pub fn quantize(coefficients: &[f32], sf_index: usize, wl_index: usize, output: &mut [i32]) {
    debug_assert_eq!(coefficients.len(), output.len());
    let bits = WORD_LENGTH_BITS[wl_index];
    if bits == 0 || sf_index == 0 {
        output.fill(0);
        return;
    }
    let q_range = ((1i64 << (bits - 1)) - 1) as f64;
    let scale = SCALE_FACTORS[sf_index];
    for (dst, &c) in output.iter_mut().zip(coefficients.iter()) {
        let q = (c as f64 * q_range / scale).round();
        *dst = q.clamp(-q_range - 1.0, q_range) as i32;
    }
}

/// Reconstruct one BFU's coefficients from quantized values
pub fn dequantize(values: &[i32], sf_index: usize, wl_index: usize, output: &mut [f32]) {
    debug_assert_eq!(values.len(), output.len());
    let bits = WORD_LENGTH_BITS[wl_index];
    if bits == 0 || sf_index == 0 {
        output.fill(0.0);
        return;
    }
    let q_range = ((1i64 << (bits - 1)) - 1) as f64;
    let scale = SCALE_FACTORS[sf_index];
    for (dst, &q) in output.iter_mut().zip(values.iter()) {
        *dst = (q as f64 * scale / q_range) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_bfu_has_zero_scale_factor() {
        assert_eq!(scale_factor_index(&[0.0; 8]), 0);
    }

    #[test]
    fn test_scale_factor_covers_peak() {
        let coeffs = [0.25f32, -0.5, 0.1];
        let sf = scale_factor_index(&coeffs);
        assert!(SCALE_FACTORS[sf] >= 0.5);
        assert!(sf == 0 || SCALE_FACTORS[sf - 1] < 0.5, "index must be the smallest cover");
    }

    #[test]
    fn test_peak_above_table_clamps_to_top() {
        let coeffs = [1.5f32];
        assert_eq!(scale_factor_index(&coeffs), 63);
    }

    #[test]
    fn test_mute_word_length_produces_zeros() {
        let coeffs = [0.3f32, -0.2];
        let mut q = [99i32; 2];
        quantize(&coeffs, 40, 0, &mut q);
        assert_eq!(q, [0, 0]);

        let mut out = [1.0f32; 2];
        dequantize(&[5, -5], 40, 0, &mut out);
        assert_eq!(out, [0.0, 0.0]);
    }

    #[test]
    fn test_mute_scale_factor_produces_zeros() {
        let coeffs = [0.3f32, -0.2];
        let mut q = [99i32; 2];
        quantize(&coeffs, 0, 8, &mut q);
        assert_eq!(q, [0, 0]);
    }

    #[test]
    fn test_quantize_clips_at_field_width() {
        // Word length index 1 is 2 bits: range -2..=1.
        let coeffs = [10.0f32, -10.0];
        let mut q = [0i32; 2];
        quantize(&coeffs, 10, 1, &mut q);
        assert_eq!(q, [1, -2]);
    }

    #[test]
    fn test_round_trip_error_is_within_one_step() {
        let coeffs: Vec<f32> = (0..16).map(|i| (i as f32 - 8.0) / 20.0).collect();
        let sf = scale_factor_index(&coeffs);
        let wl = 8; // 9 bits
        let mut q = vec![0i32; 16];
        quantize(&coeffs, sf, wl, &mut q);
        let mut out = vec![0.0f32; 16];
        dequantize(&q, sf, wl, &mut out);

        let q_range = ((1 << (WORD_LENGTH_BITS[wl] - 1)) - 1) as f32;
        let step = SCALE_FACTORS[sf] as f32 / q_range;
        for (orig, rec) in coeffs.iter().zip(out.iter()) {
            assert!(
                (orig - rec).abs() <= 0.5 * step + 1e-7,
                "{} reconstructed as {}",
                orig,
                rec
            );
        }
    }

    #[test]
    fn test_two_bit_quantization_round_trip_sign() {
        let coeffs = [0.4f32, -0.4, 0.0, 0.1];
        let sf = scale_factor_index(&coeffs);
        let mut q = [0i32; 4];
        quantize(&coeffs, sf, 1, &mut q);
        let mut out = [0.0f32; 4];
        dequantize(&q, sf, 1, &mut out);
        assert!(out[0] > 0.0 && out[1] < 0.0, "signs must survive 2-bit coding");
    }
}
