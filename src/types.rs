//! Core type definitions and format constants for ATRAC1 coding
//!
//! This module contains the frame-level data structures shared by the
//! encoder, decoder and serialization layers, together with the fixed
//! layout constants of the format.

/// PCM samples per frame and per decoded sound unit
pub const NUM_SAMPLES: usize = 512;

/// Size of one encoded sound unit in bytes
pub const SOUND_UNIT_SIZE: usize = 212;

/// Total bit budget of one sound unit
pub const FRAME_BITS: usize = SOUND_UNIT_SIZE * 8;

/// Fixed per-frame overhead: the 16-bit header plus reserved tail bits
pub const FRAME_OVERHEAD_BITS: usize = 40;

/// Bits spent on the word-length index of one active BFU
pub const WORD_LENGTH_INDEX_BITS: usize = 4;

/// Bits spent on the scale-factor index of one active BFU
pub const SCALE_FACTOR_INDEX_BITS: usize = 6;

/// Per-BFU metadata cost in bits
pub const BFU_META_BITS: usize = WORD_LENGTH_INDEX_BITS + SCALE_FACTOR_INDEX_BITS;

/// Maximum number of block floating units per frame
pub const MAX_BFUS: usize = 52;

/// Largest BFU size in spectral coefficients
pub const MAX_BFU_SIZE: usize = 20;

/// Number of QMF bands (low, mid, high)
pub const QMF_BANDS: usize = 3;

/// Round-trip delay of one QMF stage in samples at its input rate
pub const QMF_DELAY: usize = 46;

/// Samples carried across frames by each MDCT seam window
pub const MDCT_OVERLAP: usize = 32;

/// Delay applied to the high band so it lines up with the twice-filtered
/// low/mid path: half of the second-stage QMF round trip plus the MDCT
/// overlap difference, expressed at the half rate.
pub const HIGH_BAND_DELAY: usize = (QMF_DELAY + MDCT_OVERLAP) / 2;

/// Total algorithmic delay of an encode/decode round trip in samples.
///
/// The low/mid path passes the first QMF stage at full rate, the second
/// stage at half rate and carries a 32-sample MDCT tail at quarter rate;
/// the high path adds up to the same figure through `HIGH_BAND_DELAY`.
pub const CODEC_DELAY: usize = QMF_DELAY + 2 * QMF_DELAY + 4 * MDCT_OVERLAP;

/// The only sample rate the format supports
pub const SAMPLE_RATE: u32 = 44100;

/// Samples per frame produced by the QMF tree for each band
pub const BAND_SIZES: [usize; QMF_BANDS] = [128, 128, 256];

/// Per-band MDCT window mode, stored as the log2 of the block count.
///
/// A band is either coded as one long transform over the whole band or as
/// short 32-coefficient blocks: 4 of them for the low and mid bands, 8 for
/// the high band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSizeMode {
    /// log2 of the MDCT block count per band: low/mid in {0, 2}, high in {0, 3}
    pub log_count: [u8; QMF_BANDS],
}

impl BlockSizeMode {
    /// Build a mode from per-band transient decisions (true selects short blocks)
    pub fn new(low_short: bool, mid_short: bool, high_short: bool) -> Self {
        Self {
            log_count: [
                if low_short { 2 } else { 0 },
                if mid_short { 2 } else { 0 },
                if high_short { 3 } else { 0 },
            ],
        }
    }

    /// Long blocks in every band
    pub fn long_blocks() -> Self {
        Self::new(false, false, false)
    }

    /// Number of MDCT blocks used by the given band
    pub fn block_count(&self, band: usize) -> usize {
        1 << self.log_count[band]
    }

    /// Whether the given band uses short blocks
    pub fn is_short(&self, band: usize) -> bool {
        self.log_count[band] != 0
    }
}

impl Default for BlockSizeMode {
    fn default() -> Self {
        Self::long_blocks()
    }
}

/// One encoded sound unit in logical (unpacked) form
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    /// Per-band window mode
    pub block_size_mode: BlockSizeMode,
    /// Number of active BFUs, one of `tables::BFU_AMOUNT_TAB`
    pub n_bfu: usize,
    /// Scale-factor index per active BFU, each in 0..=63
    pub scale_factor_indices: Vec<u8>,
    /// Word-length index per active BFU, each in 0..=15
    pub word_length_indices: Vec<u8>,
    /// Quantized coefficients per active BFU (`tables::BFU_SIZES[i]` values each)
    pub quantized_coefficients: Vec<Vec<i32>>,
}

impl EncodedFrame {
    /// An all-silent frame with the smallest BFU population
    pub fn silence() -> Self {
        let n_bfu = crate::tables::BFU_AMOUNT_TAB[0];
        Self {
            block_size_mode: BlockSizeMode::long_blocks(),
            n_bfu,
            scale_factor_indices: vec![0; n_bfu],
            word_length_indices: vec![0; n_bfu],
            quantized_coefficients: (0..n_bfu)
                .map(|i| vec![0; crate::tables::BFU_SIZES[i]])
                .collect(),
        }
    }

    /// Bits occupied by the coefficient payload of this frame
    pub fn data_bits(&self) -> usize {
        self.word_length_indices
            .iter()
            .enumerate()
            .map(|(i, &wl)| {
                crate::tables::WORD_LENGTH_BITS[wl as usize] as usize * crate::tables::BFU_SIZES[i]
            })
            .sum()
    }

    /// Bits occupied by header and per-BFU metadata
    pub fn overhead_bits(&self) -> usize {
        FRAME_OVERHEAD_BITS + self.n_bfu * BFU_META_BITS
    }
}
