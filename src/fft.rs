//! Radix-2 fast Fourier transform
//!
//! In-place complex FFT over split real/imaginary slices. Twiddle and
//! bit-reversal tables are computed once per size and cached on the
//! instance, so repeated transforms of the same length allocate nothing.
//! All arithmetic runs in double precision; single-precision twiddles
//! drift noticeably across the stages feeding the psychoacoustic path.

use std::collections::HashMap;

use crate::error::{TransformError, TransformResult};

struct FftTables {
    /// cos(-2*pi*k/n) for k in 0..n/2
    cos: Vec<f64>,
    /// sin(-2*pi*k/n) for k in 0..n/2
    sin: Vec<f64>,
    /// Bit-reversal permutation of 0..n
    bitrev: Vec<usize>,
}

impl FftTables {
    fn new(n: usize) -> Self {
        let half = n / 2;
        let mut cos = Vec::with_capacity(half);
        let mut sin = Vec::with_capacity(half);
        for k in 0..half {
            let angle = -2.0 * std::f64::consts::PI * k as f64 / n as f64;
            cos.push(angle.cos());
            sin.push(angle.sin());
        }

        let bits = n.trailing_zeros();
        let mut bitrev = Vec::with_capacity(n);
        for i in 0..n {
            let mut rev = 0usize;
            for b in 0..bits {
                rev |= ((i >> b) & 1) << (bits - 1 - b);
            }
            bitrev.push(rev);
        }

        Self { cos, sin, bitrev }
    }
}

/// Forward complex FFT with per-size cached tables
pub struct Fft {
    tables: HashMap<usize, FftTables>,
}

impl Fft {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Precompute tables for the given size so later calls stay allocation-free
    pub fn prepare(&mut self, n: usize) -> TransformResult<()> {
        Self::check_size(n)?;
        self.tables.entry(n).or_insert_with(|| FftTables::new(n));
        Ok(())
    }

    /// In-place forward DFT of the complex sequence `re + i*im`
    pub fn forward(&mut self, re: &mut [f64], im: &mut [f64]) -> TransformResult<()> {
        if re.len() != im.len() {
            return Err(TransformError::LengthMismatch {
                re: re.len(),
                im: im.len(),
            });
        }
        let n = re.len();
        Self::check_size(n)?;
        let tables = self.tables.entry(n).or_insert_with(|| FftTables::new(n));

        for i in 0..n {
            let j = tables.bitrev[i];
            if j > i {
                re.swap(i, j);
                im.swap(i, j);
            }
        }

        let mut size = 2;
        while size <= n {
            let half = size / 2;
            let step = n / size;
            for start in (0..n).step_by(size) {
                let mut k = 0;
                for off in 0..half {
                    let (c, s) = (tables.cos[k], tables.sin[k]);
                    let i = start + off;
                    let j = i + half;
                    let tr = re[j] * c - im[j] * s;
                    let ti = re[j] * s + im[j] * c;
                    re[j] = re[i] - tr;
                    im[j] = im[i] - ti;
                    re[i] += tr;
                    im[i] += ti;
                    k += step;
                }
            }
            size *= 2;
        }
        Ok(())
    }

    fn check_size(n: usize) -> TransformResult<()> {
        if n == 0 || !n.is_power_of_two() {
            return Err(TransformError::NotPowerOfTwo(n));
        }
        Ok(())
    }
}

impl Default for Fft {
    fn default() -> Self {
        Self::new()
    }
}
