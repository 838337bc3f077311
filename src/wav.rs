//! WAV file reading and writing
//!
//! Thin wrapper around `hound` used by the command line tool. The codec
//! itself never touches files; it consumes and produces bare sample frames.

use std::path::Path;

use crate::Result;

/// Decoded WAV content with interleaved samples
pub struct WavAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Read a WAV file into interleaved 16-bit samples.
///
/// Integer files are read directly; float files are rescaled to the 16-bit
/// range.
pub fn read_wav_file<P: AsRef<Path>>(path: P) -> Result<WavAudio> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16))
            .collect::<std::result::Result<_, _>>()?,
    };

    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Write interleaved 16-bit samples as a PCM WAV file
pub fn write_wav_file<P: AsRef<Path>>(
    path: P,
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}
