//! Main ATRAC1 decoder implementation
//!
//! Mirror of the encoder pipeline: dequantize the BFUs into the spectrum,
//! inverse-transform each band with overlap-add, then merge the bands
//! through the QMF synthesis tree back into 512 PCM samples.

use crate::mdct::Atrac1Mdct;
use crate::qmf::SynthesisFilterBank;
use crate::quantization::dequantize;
use crate::tables::{bfu_band, BFU_SIZES, SPECS_START_LONG, SPECS_START_SHORT};
use crate::types::{EncodedFrame, BAND_SIZES, MAX_BFUS, NUM_SAMPLES};
use crate::Result;

/// Per-channel ATRAC1 decoder
///
/// Owns the IMDCT overlap buffers and QMF synthesis delay lines; frames
/// must be fed strictly in stream order.
pub struct Atrac1Decoder {
    filter_bank: SynthesisFilterBank,
    mdct: Atrac1Mdct,
    specs: [f32; NUM_SAMPLES],
    /// Double-length band buffers whose tails persist across frames
    low: Vec<f32>,
    mid: Vec<f32>,
    high: Vec<f32>,
    scratch: Vec<f32>,
}

impl Atrac1Decoder {
    pub fn new() -> Self {
        Self {
            filter_bank: SynthesisFilterBank::new(),
            mdct: Atrac1Mdct::new(),
            specs: [0.0; NUM_SAMPLES],
            low: vec![0.0; 2 * BAND_SIZES[0]],
            mid: vec![0.0; 2 * BAND_SIZES[1]],
            high: vec![0.0; 2 * BAND_SIZES[2]],
            scratch: vec![0.0; 32],
        }
    }

    /// Decode one sound unit into 512 PCM samples.
    ///
    /// Tolerant of degenerate frames: an empty BFU population or muted BFUs
    /// simply decode as silence in those coefficients.
    pub fn decode_frame(&mut self, frame: &EncodedFrame) -> Result<[f32; NUM_SAMPLES]> {
        self.specs.fill(0.0);
        let mode = frame.block_size_mode;

        let n_bfu = frame.n_bfu.min(MAX_BFUS);
        for i in 0..n_bfu {
            let wl = frame.word_length_indices.get(i).copied().unwrap_or(0) as usize;
            let sf = frame.scale_factor_indices.get(i).copied().unwrap_or(0) as usize;
            if wl == 0 || sf == 0 {
                continue;
            }
            let size = BFU_SIZES[i];
            let band = bfu_band(i);
            let starts = if mode.is_short(band) {
                &SPECS_START_SHORT
            } else {
                &SPECS_START_LONG
            };
            match frame.quantized_coefficients.get(i) {
                Some(values) if values.len() == size => {
                    dequantize(
                        values,
                        sf.min(63),
                        wl.min(15),
                        &mut self.scratch[..size],
                    );
                    self.specs[starts[i]..starts[i] + size]
                        .copy_from_slice(&self.scratch[..size]);
                }
                _ => {}
            }
        }

        self.mdct.inverse(
            &self.specs,
            mode,
            [&mut self.low[..], &mut self.mid[..], &mut self.high[..]],
        )?;

        let mut output = [0.0f32; NUM_SAMPLES];
        self.filter_bank.synthesis(
            &mut output,
            &self.low[..BAND_SIZES[0]],
            &self.mid[..BAND_SIZES[1]],
            &self.high[..BAND_SIZES[2]],
        );
        Ok(output)
    }
}

impl Default for Atrac1Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockSizeMode;

    #[test]
    fn test_silence_frame_decodes_to_silence() {
        let mut decoder = Atrac1Decoder::new();
        let frame = EncodedFrame::silence();
        let output = decoder.decode_frame(&frame).unwrap();
        assert!(output.iter().all(|&s| s.abs() < 1e-9));
    }

    #[test]
    fn test_empty_bfu_population_is_tolerated() {
        let mut decoder = Atrac1Decoder::new();
        let frame = EncodedFrame {
            block_size_mode: BlockSizeMode::long_blocks(),
            n_bfu: 0,
            scale_factor_indices: Vec::new(),
            word_length_indices: Vec::new(),
            quantized_coefficients: Vec::new(),
        };
        let output = decoder.decode_frame(&frame).unwrap();
        assert!(output.iter().all(|&s| s.abs() < 1e-9));
    }

    #[test]
    fn test_muted_word_length_is_tolerated() {
        let mut decoder = Atrac1Decoder::new();
        let mut frame = EncodedFrame::silence();
        // A BFU with a scale factor but word length zero must stay silent.
        frame.scale_factor_indices[3] = 12;
        let output = decoder.decode_frame(&frame).unwrap();
        assert!(output.iter().all(|&s| s.abs() < 1e-9));
    }

    #[test]
    fn test_mismatched_coefficient_length_is_tolerated() {
        let mut decoder = Atrac1Decoder::new();
        let mut frame = EncodedFrame::silence();
        frame.word_length_indices[0] = 4;
        frame.scale_factor_indices[0] = 20;
        frame.quantized_coefficients[0] = vec![1, 2]; // wrong length
        let output = decoder.decode_frame(&frame).unwrap();
        assert!(output.iter().all(|&s| s.is_finite()));
    }
}
