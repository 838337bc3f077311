//! Psychoacoustic masking analysis
//!
//! Computes 25 critical-band masking thresholds from the MDCT power
//! spectrum of one frame: the spectrum is resampled into a PSD, tonal and
//! non-tonal maskers are picked, maskers below the threshold in quiet are
//! decimated and the survivors are spread across the bark scale. The
//! thresholds feed the bit allocator as the noise floor each BFU may hide
//! under.

use crate::types::SAMPLE_RATE;

/// Number of critical bands covering 0..22050 Hz
pub const CRITICAL_BAND_COUNT: usize = 25;

/// PSD resolution: one bin per FFT/2 step plus the Nyquist bin
const PSD_SIZE: usize = 257;

/// The PSD maximum is pinned to this level before masker analysis
const PSD_TARGET_DB: f64 = 68.0;

/// Minimum level a tonal peak must rise above its neighborhood
const TONAL_PROMINENCE_DB: f64 = 7.0;

const EPS: f64 = 1e-10;

/// Critical band edges in Hz, 26 values bounding the 25 bands
pub(crate) const CRITICAL_BAND_EDGES: [f64; 26] = [
    0.0, 100.0, 200.0, 300.0, 400.0, 510.0, 630.0, 770.0, 920.0, 1080.0, 1270.0, 1480.0,
    1720.0, 2000.0, 2320.0, 2700.0, 3150.0, 3700.0, 4400.0, 5300.0, 6400.0, 7700.0, 9500.0,
    12000.0, 15500.0, 22050.0,
];

/// Center frequency of a critical band in Hz
pub(crate) fn band_center_frequency(band: usize) -> f64 {
    0.5 * (CRITICAL_BAND_EDGES[band] + CRITICAL_BAND_EDGES[band + 1])
}

/// Frequency in Hz to bark scale
fn bark(freq: f64) -> f64 {
    13.0 * (0.00076 * freq).atan() + 3.5 * ((freq / 7500.0) * (freq / 7500.0)).atan()
}

/// Absolute threshold of hearing in dB SPL at the given frequency
fn absolute_threshold_db(freq: f64) -> f64 {
    let f = (freq / 1000.0).max(0.02);
    let ath = 3.64 * f.powf(-0.8) - 6.5 * (-0.6 * (f - 3.3) * (f - 3.3)).exp()
        + 1e-3 * f.powi(4);
    ath.min(96.0)
}

struct Masker {
    freq: f64,
    spl: f64,
    tonal: bool,
}

/// Masking model over one channel's spectrum
pub struct PsychoModel {
    /// PSD bin frequencies in Hz
    bin_freq: Vec<f64>,
    /// Threshold in quiet per PSD bin
    bin_ath: Vec<f64>,
    /// Interpolation source position per PSD bin into the 512 spectrum
    resample_pos: Vec<(usize, f64)>,
    band_center_bark: [f64; CRITICAL_BAND_COUNT],
    band_ath: [f64; CRITICAL_BAND_COUNT],
    psd: Vec<f64>,
    examined: Vec<bool>,
    maskers: Vec<Masker>,
}

impl PsychoModel {
    pub fn new() -> Self {
        let mut bin_freq = Vec::with_capacity(PSD_SIZE);
        let mut bin_ath = Vec::with_capacity(PSD_SIZE);
        let mut resample_pos = Vec::with_capacity(PSD_SIZE);
        let nyquist = SAMPLE_RATE as f64 / 2.0;
        for k in 0..PSD_SIZE {
            let freq = k as f64 * nyquist / (PSD_SIZE - 1) as f64;
            bin_freq.push(freq);
            bin_ath.push(absolute_threshold_db(freq));
            let pos = k as f64 * 511.0 / (PSD_SIZE - 1) as f64;
            let i0 = (pos.floor() as usize).min(510);
            resample_pos.push((i0, pos - i0 as f64));
        }

        let mut band_center_bark = [0.0; CRITICAL_BAND_COUNT];
        let mut band_ath = [0.0; CRITICAL_BAND_COUNT];
        for b in 0..CRITICAL_BAND_COUNT {
            let center = band_center_frequency(b);
            band_center_bark[b] = bark(center);
            band_ath[b] = absolute_threshold_db(center);
        }

        Self {
            bin_freq,
            bin_ath,
            resample_pos,
            band_center_bark,
            band_ath,
            psd: vec![0.0; PSD_SIZE],
            examined: vec![false; PSD_SIZE],
            maskers: Vec::with_capacity(64),
        }
    }

    /// Compute the 25 critical-band thresholds for one frame.
    ///
    /// `power` is the natural-order MDCT power spectrum; the returned
    /// thresholds are in the same dB domain as `10*log10(power)`. All-zero
    /// input collapses to the threshold in quiet.
    pub fn analyze(
        &mut self,
        power: &[f64; 512],
        thresholds: &mut [f64; CRITICAL_BAND_COUNT],
    ) {
        let max_power = power.iter().fold(0.0f64, |m, &p| m.max(p));
        if max_power <= EPS {
            thresholds.copy_from_slice(&self.band_ath);
            return;
        }

        // Resample into the PSD and pin its maximum to the target level.
        let mut max_db = f64::MIN;
        for k in 0..PSD_SIZE {
            let (i0, frac) = self.resample_pos[k];
            let p = power[i0] * (1.0 - frac) + power[i0 + 1] * frac;
            self.psd[k] = 10.0 * (p + EPS).log10();
            max_db = max_db.max(self.psd[k]);
        }
        let offset = PSD_TARGET_DB - max_db;
        for v in self.psd.iter_mut() {
            *v += offset;
        }

        self.maskers.clear();
        self.examined.fill(false);
        self.find_tonal_maskers();
        self.find_noise_maskers();
        // Decimation: a masker below the quiet threshold masks nothing.
        let bin_ath = &self.bin_ath;
        let nyquist = SAMPLE_RATE as f64 / 2.0;
        self.maskers.retain(|m| {
            let bin = ((m.freq / nyquist) * (PSD_SIZE - 1) as f64).round() as usize;
            m.spl >= bin_ath[bin.min(PSD_SIZE - 1)]
        });

        for b in 0..CRITICAL_BAND_COUNT {
            let zb = self.band_center_bark[b];
            let mut sum = 10f64.powf(self.band_ath[b] / 10.0);
            for m in &self.maskers {
                let zm = bark(m.freq);
                let dz = zb - zm;
                if !(-3.0..8.0).contains(&dz) {
                    continue;
                }
                let av = if m.tonal {
                    -1.525 - 0.275 * zm - 4.5
                } else {
                    -1.525 - 0.175 * zm - 0.5
                };
                let vf = spreading(dz, m.spl);
                sum += 10f64.powf((m.spl + av + vf) / 10.0);
            }
            // Back into the caller's (un-normalized) dB domain.
            thresholds[b] = 10.0 * sum.log10() - offset;
        }
    }

    fn find_tonal_maskers(&mut self) {
        for k in 3..PSD_SIZE - 7 {
            if self.psd[k] <= self.psd[k - 1] || self.psd[k] < self.psd[k + 1] {
                continue;
            }
            let deltas: &[usize] = match k {
                0..=62 => &[2],
                63..=126 => &[2, 3],
                _ => &[2, 3, 4, 5, 6],
            };
            let prominent = deltas.iter().all(|&d| {
                self.psd[k] - self.psd[k - d] >= TONAL_PROMINENCE_DB
                    && self.psd[k] - self.psd[k + d] >= TONAL_PROMINENCE_DB
            });
            if !prominent {
                continue;
            }

            // Integrate the peak and its direct neighbors into one masker.
            let spl = 10.0
                * (10f64.powf(self.psd[k - 1] / 10.0)
                    + 10f64.powf(self.psd[k] / 10.0)
                    + 10f64.powf(self.psd[k + 1] / 10.0))
                .log10();
            self.maskers.push(Masker {
                freq: self.bin_freq[k],
                spl,
                tonal: true,
            });
            for d in 0..=*deltas.last().unwrap_or(&2) {
                self.examined[k - d] = true;
                self.examined[k + d] = true;
            }
        }
    }

    fn find_noise_maskers(&mut self) {
        let nyquist = SAMPLE_RATE as f64 / 2.0;
        for b in 0..CRITICAL_BAND_COUNT {
            let lo = (CRITICAL_BAND_EDGES[b] / nyquist * (PSD_SIZE - 1) as f64).ceil() as usize;
            let hi =
                (CRITICAL_BAND_EDGES[b + 1] / nyquist * (PSD_SIZE - 1) as f64).floor() as usize;
            let mut sum = 0.0f64;
            let mut weighted = 0.0f64;
            for k in lo..=hi.min(PSD_SIZE - 1) {
                if self.examined[k] {
                    continue;
                }
                let p = 10f64.powf(self.psd[k] / 10.0);
                sum += p;
                weighted += p * self.bin_freq[k];
            }
            if sum > EPS {
                self.maskers.push(Masker {
                    freq: weighted / sum,
                    spl: 10.0 * sum.log10(),
                    tonal: false,
                });
            }
        }
    }
}

impl Default for PsychoModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Piecewise-linear spreading function over the bark distance `dz`,
/// with slopes depending on the masker level `x`.
fn spreading(dz: f64, x: f64) -> f64 {
    if dz < -1.0 {
        17.0 * (dz + 1.0) - (0.4 * x + 6.0)
    } else if dz < 0.0 {
        (0.4 * x + 6.0) * dz
    } else if dz < 1.0 {
        -17.0 * dz
    } else {
        -(dz - 1.0) * (17.0 - 0.15 * x) - 17.0
    }
}
