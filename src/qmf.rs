//! Quadrature mirror filterbanks
//!
//! Two-band QMF split/merge built on the 48-tap prototype, plus the
//! two-stage trees that take a 512-sample frame to the low/mid/high band
//! signals and back. Each filter instance owns its 46-sample delay line;
//! the high band additionally passes through a 39-sample alignment delay so
//! both tree paths carry the same total latency once the MDCT overlap is
//! accounted for.

use crate::tables::QMF_WINDOW;
use crate::types::{BAND_SIZES, HIGH_BAND_DELAY, NUM_SAMPLES, QMF_DELAY};

/// One two-band QMF split/merge stage
pub struct Qmf {
    n: usize,
    delay: Vec<f64>,
    work: Vec<f64>,
}

impl Qmf {
    /// Create a stage for `n`-sample inputs (analysis) or outputs (synthesis)
    pub fn new(n: usize) -> Self {
        Self {
            n,
            delay: vec![0.0; QMF_DELAY],
            work: vec![0.0; QMF_DELAY + n],
        }
    }

    /// Split `input` into half-length low and high bands
    pub fn analysis(&mut self, input: &[f32], low: &mut [f32], high: &mut [f32]) {
        let n = self.n;
        debug_assert_eq!(input.len(), n);
        debug_assert_eq!(low.len(), n / 2);
        debug_assert_eq!(high.len(), n / 2);

        self.work[..QMF_DELAY].copy_from_slice(&self.delay);
        for (dst, &s) in self.work[QMF_DELAY..].iter_mut().zip(input.iter()) {
            *dst = s as f64;
        }

        for i in 0..n / 2 {
            let mut even = 0.0f64;
            let mut odd = 0.0f64;
            for j in 0..24 {
                even += self.work[2 * i + 47 - 2 * j] * QMF_WINDOW[2 * j];
                odd += self.work[2 * i + 46 - 2 * j] * QMF_WINDOW[2 * j + 1];
            }
            low[i] = (even + odd) as f32;
            high[i] = (even - odd) as f32;
        }
        self.delay.copy_from_slice(&self.work[n..]);
    }

    /// Merge half-length low and high bands back into `output`
    pub fn synthesis(&mut self, output: &mut [f32], low: &[f32], high: &[f32]) {
        let n = self.n;
        debug_assert_eq!(output.len(), n);
        debug_assert_eq!(low.len(), n / 2);
        debug_assert_eq!(high.len(), n / 2);

        self.work[..QMF_DELAY].copy_from_slice(&self.delay);
        // Upsample by interleaving the sum and difference phases.
        for i in 0..n / 2 {
            self.work[QMF_DELAY + 2 * i] = 0.5 * (low[i] + high[i]) as f64;
            self.work[QMF_DELAY + 2 * i + 1] = 0.5 * (low[i] - high[i]) as f64;
        }

        // Same even/odd convolutions as the analysis, with the two output
        // phases swapped relative to the anchor parity; this is what keeps
        // the round trip a clean 46-sample delay.
        for i in 0..n / 2 {
            let mut even = 0.0f64;
            let mut odd = 0.0f64;
            for j in 0..24 {
                even += self.work[2 * i + 47 - 2 * j] * QMF_WINDOW[2 * j];
                odd += self.work[2 * i + 46 - 2 * j] * QMF_WINDOW[2 * j + 1];
            }
            output[2 * i] = even as f32;
            output[2 * i + 1] = odd as f32;
        }
        self.delay.copy_from_slice(&self.work[n..]);
    }
}

/// Encoder-side QMF tree: 512 samples in, low/mid (128) and high (256) out
pub struct AnalysisFilterBank {
    qmf1: Qmf,
    qmf2: Qmf,
    mid_low: Vec<f32>,
    high_delay: Vec<f32>,
}

impl AnalysisFilterBank {
    pub fn new() -> Self {
        Self {
            qmf1: Qmf::new(NUM_SAMPLES),
            qmf2: Qmf::new(NUM_SAMPLES / 2),
            mid_low: vec![0.0; NUM_SAMPLES / 2],
            high_delay: vec![0.0; HIGH_BAND_DELAY + BAND_SIZES[2]],
        }
    }

    /// Split one frame into the three band signals
    pub fn analysis(&mut self, pcm: &[f32], low: &mut [f32], mid: &mut [f32], high: &mut [f32]) {
        debug_assert_eq!(pcm.len(), NUM_SAMPLES);
        self.qmf1
            .analysis(pcm, &mut self.mid_low, &mut self.high_delay[HIGH_BAND_DELAY..]);
        self.qmf2.analysis(&self.mid_low, low, mid);
        high.copy_from_slice(&self.high_delay[..BAND_SIZES[2]]);
        self.high_delay.copy_within(BAND_SIZES[2].., 0);
    }
}

impl Default for AnalysisFilterBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoder-side QMF tree: low/mid (128) and high (256) in, 512 samples out
pub struct SynthesisFilterBank {
    qmf1: Qmf,
    qmf2: Qmf,
    mid_low: Vec<f32>,
    high_delay: Vec<f32>,
}

impl SynthesisFilterBank {
    pub fn new() -> Self {
        Self {
            qmf1: Qmf::new(NUM_SAMPLES),
            qmf2: Qmf::new(NUM_SAMPLES / 2),
            mid_low: vec![0.0; NUM_SAMPLES / 2],
            high_delay: vec![0.0; HIGH_BAND_DELAY + BAND_SIZES[2]],
        }
    }

    /// Merge the three band signals back into one frame
    pub fn synthesis(&mut self, output: &mut [f32], low: &[f32], mid: &[f32], high: &[f32]) {
        debug_assert_eq!(output.len(), NUM_SAMPLES);
        self.qmf2.synthesis(&mut self.mid_low, low, mid);
        self.high_delay[HIGH_BAND_DELAY..].copy_from_slice(high);
        self.qmf1
            .synthesis(output, &self.mid_low, &self.high_delay[..BAND_SIZES[2]]);
        self.high_delay.copy_within(BAND_SIZES[2].., 0);
    }
}

impl Default for SynthesisFilterBank {
    fn default() -> Self {
        Self::new()
    }
}
