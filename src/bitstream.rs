//! Bit-exact sound unit serialization
//!
//! This module provides MSB-first bit packing over byte buffers, the
//! writer/reader built on it, and the conversion between `EncodedFrame` and
//! the 212-byte wire format: a 16-bit header (block modes, BFU count),
//! per-BFU word-length and scale-factor indices, then the two's-complement
//! coefficient fields, zero-padded through the last byte.

use crate::error::{FrameError, FrameResult};
use crate::tables::{BFU_AMOUNT_TAB, BFU_SIZES, WORD_LENGTH_BITS};
use crate::types::{BlockSizeMode, EncodedFrame, SOUND_UNIT_SIZE};

/// Write `bits` bits of `value` (MSB first) at the absolute bit offset.
///
/// Bit 0 is the most significant bit of `buf[0]`. Writes beyond the buffer
/// are dropped.
pub fn pack_bits(buf: &mut [u8], bit_offset: usize, value: u32, bits: usize) {
    for k in 0..bits {
        let pos = bit_offset + k;
        let byte = pos / 8;
        if byte >= buf.len() {
            break;
        }
        let shift = 7 - (pos % 8);
        let bit = (value >> (bits - 1 - k)) & 1;
        if bit != 0 {
            buf[byte] |= 1 << shift;
        } else {
            buf[byte] &= !(1 << shift);
        }
    }
}

/// Read `bits` bits (MSB first) from the absolute bit offset.
///
/// Bits beyond the buffer read as zero.
pub fn unpack_bits(buf: &[u8], bit_offset: usize, bits: usize) -> u32 {
    let mut value = 0u32;
    for k in 0..bits {
        let pos = bit_offset + k;
        let byte = pos / 8;
        let bit = if byte < buf.len() {
            (buf[byte] >> (7 - (pos % 8))) & 1
        } else {
            0
        };
        value = (value << 1) | bit as u32;
    }
    value
}

/// Sequential MSB-first writer over one sound unit
pub struct BitWriter {
    buffer: [u8; SOUND_UNIT_SIZE],
    bit_pos: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            buffer: [0u8; SOUND_UNIT_SIZE],
            bit_pos: 0,
        }
    }

    pub fn write_bits(&mut self, value: u32, bits: usize) {
        pack_bits(&mut self.buffer, self.bit_pos, value, bits);
        self.bit_pos += bits;
    }

    pub fn bits_written(&self) -> usize {
        self.bit_pos
    }

    /// Finish the unit; unwritten bits stay zero
    pub fn into_unit(self) -> [u8; SOUND_UNIT_SIZE] {
        self.buffer
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequential MSB-first reader over a byte slice
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub fn read_bits(&mut self, bits: usize) -> u32 {
        let value = unpack_bits(self.data, self.bit_pos, bits);
        self.bit_pos += bits;
        value
    }

    /// Read a two's-complement field of the given width
    pub fn read_signed(&mut self, bits: usize) -> i32 {
        let raw = self.read_bits(bits);
        if bits > 0 && (raw >> (bits - 1)) & 1 != 0 {
            raw as i32 - (1i64 << bits) as i32
        } else {
            raw as i32
        }
    }

    pub fn skip(&mut self, bits: usize) {
        self.bit_pos += bits;
    }
}

/// Pack one logical frame into its 212-byte sound unit
pub fn serialize_frame(frame: &EncodedFrame) -> [u8; SOUND_UNIT_SIZE] {
    let mut writer = BitWriter::new();
    let mode = &frame.block_size_mode;

    // 16-bit header: the block-mode fields store the complement of the
    // log2 block count, then the BFU population index and padding.
    writer.write_bits(2 - mode.log_count[0] as u32, 2);
    writer.write_bits(2 - mode.log_count[1] as u32, 2);
    writer.write_bits(3 - mode.log_count[2] as u32, 2);
    let n_bfu_index = BFU_AMOUNT_TAB
        .iter()
        .position(|&n| n == frame.n_bfu)
        .unwrap_or(BFU_AMOUNT_TAB.len() - 1);
    writer.write_bits(n_bfu_index as u32, 3);
    writer.write_bits(0, 5);

    let n_bfu = frame.n_bfu.min(crate::types::MAX_BFUS);
    for i in 0..n_bfu {
        let wl = frame.word_length_indices.get(i).copied().unwrap_or(0);
        writer.write_bits(wl as u32 & 0xF, 4);
    }
    for i in 0..n_bfu {
        let sf = frame.scale_factor_indices.get(i).copied().unwrap_or(0);
        writer.write_bits(sf as u32 & 0x3F, 6);
    }
    for i in 0..n_bfu {
        let wl = frame.word_length_indices.get(i).copied().unwrap_or(0) as usize;
        let bits = WORD_LENGTH_BITS[wl & 0xF] as usize;
        if bits == 0 {
            continue;
        }
        let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
        for j in 0..BFU_SIZES[i] {
            let value = frame
                .quantized_coefficients
                .get(i)
                .and_then(|c| c.get(j))
                .copied()
                .unwrap_or(0);
            writer.write_bits(value as u32 & mask, bits);
        }
    }

    writer.into_unit()
}

/// Unpack a 212-byte sound unit into its logical frame
pub fn deserialize_frame(data: &[u8]) -> FrameResult<EncodedFrame> {
    if data.len() != SOUND_UNIT_SIZE {
        return Err(FrameError::InvalidFrameSize {
            expected: SOUND_UNIT_SIZE,
            actual: data.len(),
        });
    }

    let mut reader = BitReader::new(data);
    let bm_low = reader.read_bits(2);
    let bm_mid = reader.read_bits(2);
    let bm_high = reader.read_bits(2);
    let block_size_mode = BlockSizeMode::new(bm_low != 2, bm_mid != 2, bm_high != 3);
    let n_bfu = BFU_AMOUNT_TAB[reader.read_bits(3) as usize];
    reader.skip(5);

    let mut word_length_indices = Vec::with_capacity(n_bfu);
    for _ in 0..n_bfu {
        word_length_indices.push(reader.read_bits(4) as u8);
    }
    let mut scale_factor_indices = Vec::with_capacity(n_bfu);
    for _ in 0..n_bfu {
        scale_factor_indices.push(reader.read_bits(6) as u8);
    }

    let mut quantized_coefficients = Vec::with_capacity(n_bfu);
    for i in 0..n_bfu {
        let bits = WORD_LENGTH_BITS[word_length_indices[i] as usize] as usize;
        let mut coeffs = vec![0i32; BFU_SIZES[i]];
        if bits > 0 {
            for value in coeffs.iter_mut() {
                *value = reader.read_signed(bits);
            }
        }
        quantized_coefficients.push(coeffs);
    }

    Ok(EncodedFrame {
        block_size_mode,
        n_bfu,
        scale_factor_indices,
        word_length_indices,
        quantized_coefficients,
    })
}
