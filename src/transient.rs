//! Per-band transient detection
//!
//! Each QMF band owns one detector that compares the magnitude spectrum of
//! the current band frame against the previous one. Four features (spectral
//! flux, flatness change, high-frequency-ratio change and energy change) are
//! averaged into a composite score; crossing the band threshold selects
//! short MDCT blocks for the frame.

use crate::fft::Fft;

/// Guard against logs and divisions on degenerate signals
const EPS: f64 = 1e-10;

/// Transient detector for one QMF band
pub struct TransientDetector {
    threshold: f64,
    fft_size: usize,
    fft: Fft,
    re: Vec<f64>,
    im: Vec<f64>,
    magnitude: Vec<f64>,
    prev_spectrum: Vec<f64>,
    has_prev: bool,
}

impl TransientDetector {
    /// Create a detector with the given analysis FFT size and score threshold
    pub fn new(fft_size: usize, threshold: f64) -> Self {
        let mut fft = Fft::new();
        let _ = fft.prepare(fft_size);
        Self {
            threshold,
            fft_size,
            fft,
            re: vec![0.0; fft_size],
            im: vec![0.0; fft_size],
            magnitude: vec![0.0; fft_size / 2],
            prev_spectrum: vec![0.0; fft_size / 2],
            has_prev: false,
        }
    }

    /// Score one band frame; returns true when short blocks should be used.
    ///
    /// The first frame never reports a transient; it only seeds the
    /// spectrum history.
    pub fn detect(&mut self, samples: &[f32]) -> bool {
        self.compute_magnitude(samples);

        let result = if self.has_prev {
            let score = self.composite_score();
            score > self.threshold
        } else {
            false
        };

        self.prev_spectrum.copy_from_slice(&self.magnitude);
        self.has_prev = true;
        result
    }

    fn compute_magnitude(&mut self, samples: &[f32]) {
        // Zero-pad when the band frame is shorter than the FFT.
        for i in 0..self.fft_size {
            self.re[i] = samples.get(i).copied().unwrap_or(0.0) as f64;
            self.im[i] = 0.0;
        }
        // Sizes are fixed at construction, so this cannot fail.
        if self.fft.forward(&mut self.re, &mut self.im).is_err() {
            self.magnitude.fill(0.0);
            return;
        }
        for k in 0..self.fft_size / 2 {
            self.magnitude[k] = (self.re[k] * self.re[k] + self.im[k] * self.im[k]).sqrt();
        }
    }

    fn composite_score(&self) -> f64 {
        let curr = &self.magnitude;
        let prev = &self.prev_spectrum;

        let curr_energy: f64 = curr.iter().map(|m| m * m).sum();
        let prev_energy: f64 = prev.iter().map(|m| m * m).sum();

        // Positive spectral flux, normalized by the current spectrum norm.
        let flux_raw: f64 = curr
            .iter()
            .zip(prev.iter())
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        let flux = flux_raw / curr_energy.sqrt().max(EPS);

        // Flatness change, square-rooted to bound its influence.
        let flatness_change =
            (Self::flatness(curr) - Self::flatness(prev)).abs().sqrt();

        // High-frequency ratio change, log-compressed.
        let hf_change = (1.0 + (Self::hf_ratio(curr) - Self::hf_ratio(prev)).abs()).ln();

        // Energy rise in dB, clamped to 30 dB and normalized.
        let energy_db = 10.0 * ((curr_energy + EPS) / (prev_energy + EPS)).log10();
        let energy_change = energy_db.max(0.0).min(30.0) / 30.0;

        (flux + flatness_change + hf_change + energy_change) / 4.0
    }

    /// Geometric over arithmetic mean of the magnitudes above the guard
    fn flatness(magnitude: &[f64]) -> f64 {
        let mut log_sum = 0.0f64;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for &m in magnitude {
            if m > EPS {
                log_sum += m.ln();
                sum += m;
                count += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }
        let geometric = (log_sum / count as f64).exp();
        let arithmetic = sum / count as f64;
        geometric / arithmetic.max(EPS)
    }

    /// Energy share of the upper half of the spectrum
    fn hf_ratio(magnitude: &[f64]) -> f64 {
        let half = magnitude.len() / 2;
        let upper: f64 = magnitude[half..].iter().map(|m| m * m).sum();
        let total: f64 = magnitude.iter().map(|m| m * m).sum();
        upper / total.max(EPS)
    }
}
