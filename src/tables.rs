//! Lookup tables for ATRAC1 coding
//!
//! This module contains the fixed format tables (BFU layout, word lengths,
//! the QMF prototype filter) and the runtime-computed tables (scale factors,
//! the MDCT seam window) shared across the codec.

use lazy_static::lazy_static;

/// Valid active-BFU populations, indexed by the 3-bit header field
pub const BFU_AMOUNT_TAB: [usize; 8] = [20, 28, 32, 36, 40, 44, 48, 52];

/// First BFU index of each QMF band, plus the terminating count
pub const BFU_BAND_BOUNDARIES: [usize; 4] = [0, 20, 36, 52];

/// Spectral coefficients grouped by each BFU (sums to 512)
pub const BFU_SIZES: [usize; 52] = [
    // low band
    8, 8, 8, 8, 4, 4, 4, 4, 8, 8, 8, 8, 6, 6, 6, 6, 6, 6, 6, 6,
    // mid band
    6, 6, 6, 6, 7, 7, 7, 7, 9, 9, 9, 9, 10, 10, 10, 10,
    // high band
    12, 12, 12, 12, 12, 12, 12, 12, 20, 20, 20, 20, 20, 20, 20, 20,
];

/// BFU start offsets within the 512-coefficient spectrum under long blocks
pub const SPECS_START_LONG: [usize; 52] = [
    0, 8, 16, 24, 32, 36, 40, 44, 48, 56, 64, 72, 80, 86, 92, 98, 104, 110, 116, 122,
    128, 134, 140, 146, 152, 159, 166, 173, 180, 189, 198, 207, 216, 226, 236, 246,
    256, 268, 280, 292, 304, 316, 328, 340, 352, 372, 392, 412, 432, 452, 472, 492,
];

/// BFU start offsets within the 512-coefficient spectrum under short blocks
pub const SPECS_START_SHORT: [usize; 52] = [
    0, 32, 64, 96, 8, 40, 72, 104, 12, 44, 76, 108, 20, 52, 84, 116, 26, 58, 90, 122,
    128, 160, 192, 224, 134, 166, 198, 230, 141, 173, 205, 237, 150, 182, 214, 246,
    256, 288, 320, 352, 384, 416, 448, 480, 268, 300, 332, 364, 396, 428, 460, 492,
];

/// Coefficient bit width selected by each word-length index
pub const WORD_LENGTH_BITS: [u32; 16] = [0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];

/// Half of the 48-tap QMF prototype; the full bank mirrors these taps.
pub const QMF_WINDOW_HALF: [f64; 24] = [
    -0.000029238139,
    -0.000184109580,
    -0.000112315138,
    0.000602345390,
    0.000484503806,
    -0.001705877949,
    -0.001041114796,
    0.004068033770,
    0.001566677820,
    -0.008430772461,
    -0.001512299757,
    0.015680588782,
    -0.000122339843,
    -0.026883240789,
    0.004925364163,
    0.043472178280,
    -0.015603342094,
    -0.068180441856,
    0.037618979812,
    0.108652018011,
    -0.087192758918,
    -0.198768734932,
    0.264158189297,
    0.928483188152,
];

/// Band index (0 low, 1 mid, 2 high) owning the given BFU
pub fn bfu_band(bfu: usize) -> usize {
    if bfu < BFU_BAND_BOUNDARIES[1] {
        0
    } else if bfu < BFU_BAND_BOUNDARIES[2] {
        1
    } else {
        2
    }
}

lazy_static! {
    /// Quantization scale factors: 2^(i/3 - 21) for i in 0..64
    pub static ref SCALE_FACTORS: [f64; 64] = {
        let mut table = [0.0f64; 64];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = 2.0f64.powf(i as f64 / 3.0 - 21.0);
        }
        table
    };

    /// 32-sample sine seam window: sin((i + 0.5) * pi / 64)
    pub static ref SINE_WINDOW: [f32; 32] = {
        let mut table = [0.0f32; 32];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = ((i as f64 + 0.5) * std::f64::consts::PI / 64.0).sin() as f32;
        }
        table
    };

    /// Full 48-tap QMF prototype, mirrored from `QMF_WINDOW_HALF`
    pub static ref QMF_WINDOW: [f64; 48] = {
        let mut table = [0.0f64; 48];
        for (i, &tap) in QMF_WINDOW_HALF.iter().enumerate() {
            table[i] = tap;
            table[47 - i] = tap;
        }
        table
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bfu_sizes_cover_spectrum() {
        assert_eq!(BFU_SIZES.iter().sum::<usize>(), 512);
    }

    #[test]
    fn test_long_offsets_are_cumulative_sizes() {
        let mut offset = 0;
        for (i, &size) in BFU_SIZES.iter().enumerate() {
            assert_eq!(SPECS_START_LONG[i], offset, "BFU {} long offset", i);
            offset += size;
        }
        assert_eq!(offset, 512);
    }

    #[test]
    fn test_short_offsets_tile_spectrum() {
        // Every coefficient index must be covered exactly once in short mode.
        let mut covered = [0u8; 512];
        for (i, &size) in BFU_SIZES.iter().enumerate() {
            for j in 0..size {
                covered[SPECS_START_SHORT[i] + j] += 1;
            }
        }
        assert!(covered.iter().all(|&c| c == 1), "short offsets must tile 0..512");
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(bfu_band(0), 0);
        assert_eq!(bfu_band(19), 0);
        assert_eq!(bfu_band(20), 1);
        assert_eq!(bfu_band(35), 1);
        assert_eq!(bfu_band(36), 2);
        assert_eq!(bfu_band(51), 2);
    }

    #[test]
    fn test_scale_factor_table() {
        assert!((SCALE_FACTORS[0] - 2.0f64.powi(-21)).abs() < 1e-12);
        assert!((SCALE_FACTORS[63] - 1.0).abs() < 1e-12);
        for w in SCALE_FACTORS.windows(2) {
            assert!(w[0] < w[1], "scale factors must be strictly increasing");
        }
    }

    #[test]
    fn test_qmf_window_is_mirrored() {
        for i in 0..24 {
            assert_eq!(QMF_WINDOW[i], QMF_WINDOW[47 - i]);
        }
    }

    #[test]
    fn test_sine_window_tdac_condition() {
        // sin^2 + cos^2 across the seam must sum to one for perfect
        // reconstruction through the overlap.
        for i in 0..32 {
            let a = SINE_WINDOW[i] as f64;
            let b = SINE_WINDOW[31 - i] as f64;
            assert!((a * a + b * b - 1.0).abs() < 1e-6);
        }
    }
}
