//! AEA container header and stream helpers
//!
//! An AEA file is a 2048-byte header followed by a flat sequence of
//! 212-byte sound units, interleaved unit-by-unit across channels. The
//! header carries a magic number, a null-padded ASCII title, the total
//! frame count and the channel count.

use std::io::{Read, Write};

use crate::error::{CodecError, ContainerError, ContainerResult};
use crate::types::SOUND_UNIT_SIZE;

/// Size of the AEA file header in bytes
pub const AEA_HEADER_SIZE: usize = 2048;

/// Magic bytes identifying an AEA stream
pub const AEA_MAGIC: [u8; 4] = [0x00, 0x08, 0x00, 0x00];

/// Maximum title length in bytes (the field is null-terminated)
pub const AEA_TITLE_MAX: usize = 255;

const TITLE_OFFSET: usize = 4;
const FRAME_COUNT_OFFSET: usize = 260;
const CHANNEL_COUNT_OFFSET: usize = 264;

/// Parsed AEA header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeaHeader {
    /// ASCII track title
    pub title: String,
    /// Total sound units in the file (units per channel times channels)
    pub frame_count: u32,
    /// 1 for mono, 2 for stereo
    pub channel_count: u8,
}

impl AeaHeader {
    /// Build the 2048-byte header for the given stream parameters
    pub fn create(
        title: &str,
        frame_count: u32,
        channel_count: u8,
    ) -> ContainerResult<[u8; AEA_HEADER_SIZE]> {
        if !title.is_ascii() {
            return Err(ContainerError::InvalidTitle {
                reason: "title must be ASCII".to_string(),
            });
        }
        if title.len() > AEA_TITLE_MAX {
            return Err(ContainerError::InvalidTitle {
                reason: format!("title length {} exceeds {}", title.len(), AEA_TITLE_MAX),
            });
        }
        if channel_count != 1 && channel_count != 2 {
            return Err(ContainerError::InvalidChannelCount(channel_count));
        }

        let mut header = [0u8; AEA_HEADER_SIZE];
        header[..4].copy_from_slice(&AEA_MAGIC);
        header[TITLE_OFFSET..TITLE_OFFSET + title.len()].copy_from_slice(title.as_bytes());
        header[FRAME_COUNT_OFFSET..FRAME_COUNT_OFFSET + 4]
            .copy_from_slice(&frame_count.to_le_bytes());
        header[CHANNEL_COUNT_OFFSET] = channel_count;
        Ok(header)
    }

    /// Parse a 2048-byte header
    pub fn parse(data: &[u8]) -> ContainerResult<Self> {
        if data.len() < AEA_HEADER_SIZE {
            return Err(ContainerError::Truncated {
                expected: AEA_HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[..4] != AEA_MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(&data[..4]);
            return Err(ContainerError::InvalidMagic { found });
        }

        let title_field = &data[TITLE_OFFSET..TITLE_OFFSET + AEA_TITLE_MAX + 1];
        let title_len = title_field.iter().position(|&b| b == 0).unwrap_or(AEA_TITLE_MAX);
        let title: String = title_field[..title_len]
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect();

        let mut count_bytes = [0u8; 4];
        count_bytes.copy_from_slice(&data[FRAME_COUNT_OFFSET..FRAME_COUNT_OFFSET + 4]);
        let frame_count = u32::from_le_bytes(count_bytes);

        let channel_count = data[CHANNEL_COUNT_OFFSET];
        if channel_count != 1 && channel_count != 2 {
            return Err(ContainerError::InvalidChannelCount(channel_count));
        }

        Ok(Self {
            title,
            frame_count,
            channel_count,
        })
    }
}

/// Write a complete AEA stream: header plus all sound units in wire order
pub fn write_aea<W: Write>(
    writer: &mut W,
    title: &str,
    channel_count: u8,
    units: &[[u8; SOUND_UNIT_SIZE]],
) -> Result<(), CodecError> {
    let header = AeaHeader::create(title, units.len() as u32, channel_count)?;
    writer.write_all(&header)?;
    for unit in units {
        writer.write_all(unit)?;
    }
    Ok(())
}

/// Read a complete AEA stream into its header and sound units.
///
/// A trailing partial unit is reported as `Truncated`.
pub fn read_aea<R: Read>(
    reader: &mut R,
) -> Result<(AeaHeader, Vec<[u8; SOUND_UNIT_SIZE]>), CodecError> {
    let mut header_bytes = [0u8; AEA_HEADER_SIZE];
    let got = read_up_to(reader, &mut header_bytes)?;
    if got < AEA_HEADER_SIZE {
        return Err(ContainerError::Truncated {
            expected: AEA_HEADER_SIZE,
            actual: got,
        }
        .into());
    }
    let header = AeaHeader::parse(&header_bytes)?;

    let mut units = Vec::new();
    loop {
        let mut unit = [0u8; SOUND_UNIT_SIZE];
        let got = read_up_to(reader, &mut unit)?;
        if got == 0 {
            break;
        }
        if got < SOUND_UNIT_SIZE {
            return Err(ContainerError::Truncated {
                expected: SOUND_UNIT_SIZE,
                actual: got,
            }
            .into());
        }
        units.push(unit);
    }
    Ok((header, units))
}

/// Fill `buf` as far as the stream allows, returning the bytes read
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
