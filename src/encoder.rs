//! Main ATRAC1 encoder implementation
//!
//! This module provides the Atrac1Encoder struct that coordinates all the
//! encoding stages from PCM input to one encoded sound unit per frame, and
//! the validated options controlling transient detection.

use log::debug;

use crate::bitalloc::{compute_smr, BitAllocator};
use crate::error::{OptionsError, OptionsResult};
use crate::mdct::Atrac1Mdct;
use crate::psycho::{PsychoModel, CRITICAL_BAND_COUNT};
use crate::qmf::AnalysisFilterBank;
use crate::quantization::{quantize, scale_factor_index};
use crate::tables::{bfu_band, BFU_SIZES, SPECS_START_LONG, SPECS_START_SHORT};
use crate::transient::TransientDetector;
use crate::types::{
    BlockSizeMode, EncodedFrame, BAND_SIZES, MAX_BFUS, MAX_BFU_SIZE, MDCT_OVERLAP, NUM_SAMPLES,
};
use crate::Result;

const EPS: f64 = 1e-10;

/// Encoder tuning options
///
/// The per-band transient thresholds scale how eagerly the encoder switches
/// to short MDCT blocks; lower values switch more often.
#[derive(Debug, Clone, Copy)]
pub struct EncoderOptions {
    pub transient_threshold_low: f64,
    pub transient_threshold_mid: f64,
    pub transient_threshold_high: f64,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            transient_threshold_low: 1.0,
            transient_threshold_mid: 1.5,
            transient_threshold_high: 2.0,
        }
    }
}

impl EncoderOptions {
    /// Validate every option against its allowed range
    pub fn validate(&self) -> OptionsResult<()> {
        Self::check("transient_threshold_low", self.transient_threshold_low, 0.01, 2.0)?;
        Self::check("transient_threshold_mid", self.transient_threshold_mid, 0.01, 3.0)?;
        Self::check("transient_threshold_high", self.transient_threshold_high, 0.01, 4.0)?;
        Ok(())
    }

    fn check(name: &'static str, value: f64, min: f64, max: f64) -> OptionsResult<()> {
        if !(min..=max).contains(&value) || value.is_nan() {
            return Err(OptionsError::ThresholdOutOfRange {
                name,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Per-channel ATRAC1 encoder
///
/// One instance owns every piece of streaming state (QMF delay lines, MDCT
/// seam tails, transient history) and all transform scratch, so frames must
/// be fed strictly in order and channels each get their own instance.
pub struct Atrac1Encoder {
    options: EncoderOptions,
    filter_bank: AnalysisFilterBank,
    transient_detectors: [TransientDetector; 3],
    mdct: Atrac1Mdct,
    psycho: PsychoModel,
    allocator: BitAllocator,
    /// Band working buffers: fresh samples plus the 32-sample MDCT tail slot
    low: Vec<f32>,
    mid: Vec<f32>,
    high: Vec<f32>,
    specs: [f32; NUM_SAMPLES],
    power: [f64; NUM_SAMPLES],
    thresholds: [f64; CRITICAL_BAND_COUNT],
    energy_db: [f64; MAX_BFUS],
    bfu_buf: [[f32; MAX_BFU_SIZE]; MAX_BFUS],
    frames_encoded: u64,
}

impl Atrac1Encoder {
    /// Create an encoder with default options
    pub fn new() -> Self {
        // Defaults always validate.
        match Self::with_options(EncoderOptions::default()) {
            Ok(encoder) => encoder,
            Err(_) => unreachable!("default options are valid"),
        }
    }

    /// Create an encoder with the given options, validating them first
    pub fn with_options(options: EncoderOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            filter_bank: AnalysisFilterBank::new(),
            transient_detectors: [
                TransientDetector::new(128, options.transient_threshold_low),
                TransientDetector::new(128, options.transient_threshold_mid),
                TransientDetector::new(256, options.transient_threshold_high),
            ],
            mdct: Atrac1Mdct::new(),
            psycho: PsychoModel::new(),
            allocator: BitAllocator::new(),
            low: vec![0.0; BAND_SIZES[0] + MDCT_OVERLAP],
            mid: vec![0.0; BAND_SIZES[1] + MDCT_OVERLAP],
            high: vec![0.0; BAND_SIZES[2] + MDCT_OVERLAP],
            specs: [0.0; NUM_SAMPLES],
            power: [0.0; NUM_SAMPLES],
            thresholds: [0.0; CRITICAL_BAND_COUNT],
            energy_db: [0.0; MAX_BFUS],
            bfu_buf: [[0.0; MAX_BFU_SIZE]; MAX_BFUS],
            frames_encoded: 0,
        })
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Encode one 512-sample frame into its logical sound unit.
    ///
    /// Frames carry state across calls and must arrive in stream order.
    pub fn encode_frame(&mut self, pcm: &[f32; NUM_SAMPLES]) -> Result<EncodedFrame> {
        // Subband split.
        self.filter_bank.analysis(
            pcm,
            &mut self.low[..BAND_SIZES[0]],
            &mut self.mid[..BAND_SIZES[1]],
            &mut self.high[..BAND_SIZES[2]],
        );

        // Window decision per band.
        let mode = BlockSizeMode::new(
            self.transient_detectors[0].detect(&self.low[..BAND_SIZES[0]]),
            self.transient_detectors[1].detect(&self.mid[..BAND_SIZES[1]]),
            self.transient_detectors[2].detect(&self.high[..BAND_SIZES[2]]),
        );

        // Time to frequency.
        self.mdct.forward(
            [&mut self.low[..], &mut self.mid[..], &mut self.high[..]],
            &mut self.specs,
            mode,
        )?;

        // Masking analysis over the natural-order power spectrum.
        natural_order_power(&self.specs, mode, &mut self.power);
        self.psycho.analyze(&self.power, &mut self.thresholds);

        // Group coefficients into BFUs and measure their energies.
        for i in 0..MAX_BFUS {
            let band = bfu_band(i);
            let starts = if mode.is_short(band) {
                &SPECS_START_SHORT
            } else {
                &SPECS_START_LONG
            };
            let size = BFU_SIZES[i];
            let mut energy = 0.0f64;
            for j in 0..size {
                let c = self.specs[starts[i] + j];
                self.bfu_buf[i][j] = c;
                energy += (c as f64) * (c as f64);
            }
            self.energy_db[i] = 10.0 * (energy + EPS).log10();
        }

        // Distribute the bit budget by signal-to-mask ratio.
        let smr = compute_smr(&self.energy_db, &self.thresholds, mode);
        let allocation = self.allocator.allocate(&smr);

        // Quantize each active BFU.
        let n_bfu = allocation.n_bfu;
        let mut frame = EncodedFrame {
            block_size_mode: mode,
            n_bfu,
            scale_factor_indices: Vec::with_capacity(n_bfu),
            word_length_indices: Vec::with_capacity(n_bfu),
            quantized_coefficients: Vec::with_capacity(n_bfu),
        };
        for i in 0..n_bfu {
            let size = BFU_SIZES[i];
            let coeffs = &self.bfu_buf[i][..size];
            let mut sf = scale_factor_index(coeffs);
            let mut wl = allocation.word_lengths[i] as usize;
            // A muted BFU is muted on both axes.
            if sf == 0 {
                wl = 0;
            }
            if wl == 0 {
                sf = 0;
            }
            let mut quantized = vec![0i32; size];
            quantize(coeffs, sf, wl, &mut quantized);
            frame.scale_factor_indices.push(sf as u8);
            frame.word_length_indices.push(wl as u8);
            frame.quantized_coefficients.push(quantized);
        }

        self.frames_encoded += 1;
        debug!(
            "frame {}: blocks {:?}, {} BFUs, {} data bits",
            self.frames_encoded,
            mode.log_count,
            n_bfu,
            frame.data_bits()
        );
        Ok(frame)
    }

    /// Number of frames encoded so far
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }
}

impl Default for Atrac1Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Square the spectrum into natural frequency order, undoing the wire-order
/// reversal of the mid and high bands (block-wise under short windows).
fn natural_order_power(specs: &[f32; NUM_SAMPLES], mode: BlockSizeMode, power: &mut [f64; NUM_SAMPLES]) {
    const BAND_OFFSETS: [usize; 3] = [0, 128, 256];
    for band in 0..3 {
        let start = BAND_OFFSETS[band];
        let len = BAND_SIZES[band];
        if band == 0 {
            for i in 0..len {
                let c = specs[start + i] as f64;
                power[start + i] = c * c;
            }
            continue;
        }
        let block_sz = if mode.is_short(band) { 32 } else { len };
        for block in (0..len).step_by(block_sz) {
            for off in 0..block_sz {
                let c = specs[start + block + off] as f64;
                power[start + block + (block_sz - 1 - off)] = c * c;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::BFU_AMOUNT_TAB;
    use crate::types::{BFU_META_BITS, FRAME_BITS, FRAME_OVERHEAD_BITS};

    #[test]
    fn test_default_options_are_valid() {
        assert!(EncoderOptions::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_threshold_is_rejected() {
        let options = EncoderOptions {
            transient_threshold_low: 2.5,
            ..EncoderOptions::default()
        };
        match Atrac1Encoder::with_options(options) {
            Err(crate::CodecError::Options(OptionsError::ThresholdOutOfRange {
                name, ..
            })) => {
                assert_eq!(name, "transient_threshold_low");
            }
            other => panic!("expected option error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_silence_encodes_to_zero_data_bits() {
        let mut encoder = Atrac1Encoder::new();
        let frame = encoder.encode_frame(&[0.0; NUM_SAMPLES]).unwrap();
        assert!(BFU_AMOUNT_TAB.contains(&frame.n_bfu));
        assert_eq!(frame.data_bits(), 0, "silence must pack no coefficient bits");
        assert!(frame.scale_factor_indices.iter().all(|&sf| sf == 0));
        assert!(frame.word_length_indices.iter().all(|&wl| wl == 0));
    }

    #[test]
    fn test_tone_frame_respects_budget_and_ranges() {
        let mut encoder = Atrac1Encoder::new();
        let mut frames = Vec::new();
        for k in 0..4 {
            let pcm: [f32; NUM_SAMPLES] = std::array::from_fn(|i| {
                (2.0 * std::f64::consts::PI * 440.0 * (k * NUM_SAMPLES + i) as f64 / 44100.0)
                    .sin() as f32
                    * 0.8
            });
            frames.push(encoder.encode_frame(&pcm).unwrap());
        }
        let frame = frames.pop().unwrap();
        assert!(frame.data_bits() > 0, "a loud tone must allocate bits");
        assert!(
            frame.data_bits() + FRAME_OVERHEAD_BITS + frame.n_bfu * BFU_META_BITS <= FRAME_BITS
        );
        assert!(frame.scale_factor_indices.iter().all(|&sf| sf <= 63));
        assert!(frame.word_length_indices.iter().all(|&wl| wl <= 15));
    }

    #[test]
    fn test_burst_selects_short_blocks() {
        let mut encoder = Atrac1Encoder::new();
        let silence = [0.0f32; NUM_SAMPLES];
        encoder.encode_frame(&silence).unwrap();
        encoder.encode_frame(&silence).unwrap();

        // A hard low-frequency onset midway through the frame.
        let burst: [f32; NUM_SAMPLES] = std::array::from_fn(|i| {
            if i < 256 {
                0.0
            } else {
                0.9 * (2.0 * std::f64::consts::PI * 300.0 * i as f64 / 44100.0).sin() as f32
                    * if (i / 5) % 2 == 0 { 1.0 } else { -1.0 }
            }
        });
        let f1 = encoder.encode_frame(&burst).unwrap();
        let f2 = encoder.encode_frame(&burst).unwrap();
        let any_short = (0..3).any(|b| {
            f1.block_size_mode.is_short(b) || f2.block_size_mode.is_short(b)
        });
        assert!(any_short, "burst must trigger short blocks in some band");
    }

    #[test]
    fn test_natural_order_power_reverses_high_band() {
        let mut specs = [0.0f32; NUM_SAMPLES];
        specs[256] = 2.0; // wire start of the high band
        let mut power = [0.0f64; NUM_SAMPLES];
        natural_order_power(&specs, BlockSizeMode::long_blocks(), &mut power);
        assert_eq!(power[511], 4.0, "high band wire start is the top frequency");
        assert_eq!(power[256], 0.0);
    }
}
