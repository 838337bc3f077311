//! Rate-distortion bit allocation
//!
//! Assigns a word length to each active BFU under the hard frame bit
//! budget. The allocator is driven by per-BFU signal-to-mask ratios: a
//! max-heap keyed by SMR hands out one word-length upgrade at a time, and
//! every upgrade decays the winner's priority by the distortion gain of the
//! added bits. The heap is updated in place at the root; entries are never
//! reinserted.

use crate::psycho::{band_center_frequency, CRITICAL_BAND_COUNT};
use crate::tables::{
    bfu_band, BFU_AMOUNT_TAB, BFU_SIZES, SPECS_START_LONG, SPECS_START_SHORT, WORD_LENGTH_BITS,
};
use crate::types::{
    BlockSizeMode, BAND_SIZES, BFU_META_BITS, FRAME_BITS, FRAME_OVERHEAD_BITS, MAX_BFUS,
};

const EPS: f64 = 1e-10;

/// Quantization noise drops by about this much per added bit
const DB_PER_BIT: f64 = 6.02;

/// Frequency span of each QMF band in Hz
const BAND_FREQ_RANGES: [(f64, f64); 3] = [
    (0.0, 5512.5),
    (5512.5, 11025.0),
    (11025.0, 22050.0),
];

/// Result of one frame's allocation
#[derive(Debug, Clone)]
pub struct Allocation {
    /// Active BFU count, one of `BFU_AMOUNT_TAB`
    pub n_bfu: usize,
    /// Word-length index per BFU (0 for BFUs past `n_bfu`)
    pub word_lengths: [u8; MAX_BFUS],
}

impl Allocation {
    /// Coefficient bits consumed by this allocation
    pub fn data_bits(&self) -> usize {
        self.word_lengths[..self.n_bfu]
            .iter()
            .enumerate()
            .map(|(i, &wl)| WORD_LENGTH_BITS[wl as usize] as usize * BFU_SIZES[i])
            .sum()
    }

    /// Bits the coefficient payload may legally occupy
    pub fn budget(&self) -> usize {
        FRAME_BITS - FRAME_OVERHEAD_BITS - self.n_bfu * BFU_META_BITS
    }
}

/// Greedy SMR-driven allocator
pub struct BitAllocator {
    /// Priority decay applied when a BFU reaches the indexed word length
    delta_priority: [f64; 16],
    heap: Vec<(f64, usize)>,
}

impl BitAllocator {
    pub fn new() -> Self {
        let mut delta_priority = [0.0f64; 16];
        for wl in 1..16 {
            let step = WORD_LENGTH_BITS[wl] - WORD_LENGTH_BITS[wl - 1];
            delta_priority[wl] = -DB_PER_BIT * step as f64;
        }
        Self {
            delta_priority,
            heap: Vec::with_capacity(MAX_BFUS),
        }
    }

    /// Distribute word lengths for one frame given per-BFU SMRs
    pub fn allocate(&mut self, smr: &[f64; MAX_BFUS]) -> Allocation {
        let n_bfu = select_bfu_count(smr);
        let mut allocation = Allocation {
            n_bfu,
            word_lengths: [0u8; MAX_BFUS],
        };
        let budget = allocation.budget();
        let mut used = 0usize;

        self.heap.clear();
        for (i, &s) in smr.iter().take(n_bfu).enumerate() {
            // NaN priorities would corrupt the heap order; such BFUs are
            // simply never allocated.
            if s.is_finite() {
                self.heap.push((s, i));
            }
        }
        let len = self.heap.len();
        for i in (0..len / 2).rev() {
            self.sift_down(i);
        }

        while !self.heap.is_empty() {
            let (priority, bfu) = self.heap[0];
            let wl = allocation.word_lengths[bfu] as usize;
            if wl >= 15 {
                self.pop_root();
                continue;
            }
            let step = WORD_LENGTH_BITS[wl + 1] - WORD_LENGTH_BITS[wl];
            let step_bits = step as usize * BFU_SIZES[bfu];
            if used + step_bits <= budget {
                allocation.word_lengths[bfu] += 1;
                used += step_bits;
                self.heap[0].0 = priority + self.delta_priority[wl + 1];
                self.sift_down(0);
            } else {
                self.pop_root();
            }
        }

        // The loop above accounts for every bit it hands out; if that ever
        // breaks, demote BFUs from the top until the frame fits again.
        let mut total = allocation.data_bits();
        debug_assert!(total <= budget, "allocator exceeded budget: {} > {}", total, budget);
        let mut i = n_bfu;
        while total > budget && i > 0 {
            i -= 1;
            total -= WORD_LENGTH_BITS[allocation.word_lengths[i] as usize] as usize * BFU_SIZES[i];
            allocation.word_lengths[i] = 0;
        }

        allocation
    }

    fn pop_root(&mut self) {
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        self.heap.pop();
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut largest = i;
            if left < self.heap.len()
                && self.heap[left].0.total_cmp(&self.heap[largest].0).is_gt()
            {
                largest = left;
            }
            if right < self.heap.len()
                && self.heap[right].0.total_cmp(&self.heap[largest].0).is_gt()
            {
                largest = right;
            }
            if largest == i {
                break;
            }
            self.heap.swap(i, largest);
            i = largest;
        }
    }
}

impl Default for BitAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the active BFU count: take the smallest population whose excluded
/// BFUs contribute less than a tenth of the included average SMR.
fn select_bfu_count(smr: &[f64; MAX_BFUS]) -> usize {
    for &count in &BFU_AMOUNT_TAB {
        if count == MAX_BFUS {
            break;
        }
        let included = positive_mean(&smr[..count]);
        let excluded = positive_mean(&smr[count..]);
        if excluded <= EPS || excluded < 0.1 * included {
            return count;
        }
    }
    MAX_BFUS
}

fn positive_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().filter(|v| v.is_finite()).map(|v| v.max(0.0)).sum();
    sum / values.len() as f64
}

/// Center frequency in Hz of a BFU under the given block mode.
///
/// The mid and high bands are stored in reversed spectral order, so a BFU's
/// wire position maps to its mirror image within the band (or within its
/// 32-coefficient block under short windows).
pub fn bfu_center_frequency(bfu: usize, mode: BlockSizeMode) -> f64 {
    let band = bfu_band(bfu);
    let band_start = [0usize, 128, 256][band];
    let short = mode.is_short(band);
    let starts = if short { &SPECS_START_SHORT } else { &SPECS_START_LONG };
    let start_in_band = starts[bfu] - band_start;
    let block_sz = if short { 32 } else { BAND_SIZES[band] };
    let center = (start_in_band % block_sz) as f64 + BFU_SIZES[bfu] as f64 / 2.0;
    let frac = if band == 0 {
        center / block_sz as f64
    } else {
        (block_sz as f64 - center) / block_sz as f64
    };
    let (lo, hi) = BAND_FREQ_RANGES[band];
    lo + frac * (hi - lo)
}

/// Masking threshold at an arbitrary frequency, linearly interpolated
/// between the critical-band centers.
pub fn interpolate_threshold(thresholds: &[f64; CRITICAL_BAND_COUNT], freq: f64) -> f64 {
    let first = band_center_frequency(0);
    if freq <= first {
        return thresholds[0];
    }
    for b in 0..CRITICAL_BAND_COUNT - 1 {
        let c0 = band_center_frequency(b);
        let c1 = band_center_frequency(b + 1);
        if freq <= c1 {
            let t = (freq - c0) / (c1 - c0);
            return thresholds[b] + t * (thresholds[b + 1] - thresholds[b]);
        }
    }
    thresholds[CRITICAL_BAND_COUNT - 1]
}

/// Per-BFU signal-to-mask ratios from BFU energies and band thresholds
pub fn compute_smr(
    bfu_energy_db: &[f64; MAX_BFUS],
    thresholds: &[f64; CRITICAL_BAND_COUNT],
    mode: BlockSizeMode,
) -> [f64; MAX_BFUS] {
    let mut smr = [0.0f64; MAX_BFUS];
    for i in 0..MAX_BFUS {
        let freq = bfu_center_frequency(i, mode);
        smr[i] = bfu_energy_db[i] - interpolate_threshold(thresholds, freq);
    }
    smr
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_silence_settles_on_smallest_population() {
        let smr = [-60.0f64; MAX_BFUS];
        assert_eq!(select_bfu_count(&smr), 20);
    }

    #[test]
    fn test_spread_energy_keeps_all_bfus() {
        let smr = [25.0f64; MAX_BFUS];
        assert_eq!(select_bfu_count(&smr), MAX_BFUS);
    }

    #[test]
    fn test_allocation_respects_budget() {
        let mut allocator = BitAllocator::new();
        let mut smr = [-10.0f64; MAX_BFUS];
        smr[3] = 60.0;
        smr[10] = 45.0;
        let allocation = allocator.allocate(&smr);
        assert!(allocation.data_bits() <= allocation.budget());
        assert!(BFU_AMOUNT_TAB.contains(&allocation.n_bfu));
    }

    #[test]
    fn test_stronger_bfu_gets_more_bits() {
        let mut allocator = BitAllocator::new();
        let mut smr = [0.0f64; MAX_BFUS];
        smr[2] = 50.0;
        smr[7] = 5.0;
        let allocation = allocator.allocate(&smr);
        assert!(
            allocation.word_lengths[2] >= allocation.word_lengths[7],
            "BFU with 50 dB SMR got {} vs {}",
            allocation.word_lengths[2],
            allocation.word_lengths[7]
        );
    }

    #[test]
    fn test_nan_smr_is_skipped() {
        let mut allocator = BitAllocator::new();
        let mut smr = [10.0f64; MAX_BFUS];
        smr[5] = f64::NAN;
        let allocation = allocator.allocate(&smr);
        assert_eq!(allocation.word_lengths[5], 0, "NaN BFU must stay unallocated");
        assert!(allocation.data_bits() <= allocation.budget());
    }

    #[test]
    fn test_high_band_frequency_mapping_is_reversed() {
        let mode = BlockSizeMode::long_blocks();
        // The first high-band BFU sits at the top of the spectrum on the
        // wire, the last one just above the band edge.
        let first = bfu_center_frequency(36, mode);
        let last = bfu_center_frequency(51, mode);
        assert!(first > 20000.0, "BFU 36 center {}", first);
        assert!(last < 12500.0, "BFU 51 center {}", last);
        // Low band is stored in natural order.
        assert!(bfu_center_frequency(0, mode) < bfu_center_frequency(19, mode));
    }

    #[test]
    fn test_threshold_interpolation_clamps_at_edges() {
        let mut thresholds = [0.0f64; CRITICAL_BAND_COUNT];
        for (b, t) in thresholds.iter_mut().enumerate() {
            *t = b as f64;
        }
        assert_eq!(interpolate_threshold(&thresholds, 0.0), 0.0);
        assert_eq!(interpolate_threshold(&thresholds, 22050.0), 24.0);
        let mid = interpolate_threshold(&thresholds, 1000.0);
        assert!(mid > 0.0 && mid < 24.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 200,
            verbose: 0,
            max_shrink_iters: 0,
            failure_persistence: None,
            ..ProptestConfig::default()
        })]

        #[test]
        fn property_allocation_never_exceeds_budget(
            smr_values in prop::collection::vec(-80.0f64..80.0, MAX_BFUS)
        ) {
            let mut smr = [0.0f64; MAX_BFUS];
            smr.copy_from_slice(&smr_values);
            let mut allocator = BitAllocator::new();
            let allocation = allocator.allocate(&smr);
            prop_assert!(allocation.data_bits() <= allocation.budget());
            prop_assert!(BFU_AMOUNT_TAB.contains(&allocation.n_bfu));
            for &wl in allocation.word_lengths.iter() {
                prop_assert!(wl <= 15);
            }
            for i in allocation.n_bfu..MAX_BFUS {
                prop_assert_eq!(allocation.word_lengths[i], 0);
            }
        }
    }
}
