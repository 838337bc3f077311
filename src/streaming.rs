//! Streaming wrappers around the frame-based codec
//!
//! Two small utilities sit between the file layer and the per-frame API:
//! `FrameChunker` slices an arbitrary PCM stream into 512-sample frames and
//! pads the tail so the decoder can flush, while `DelayCompensator` drops
//! the codec's algorithmic delay from the decoded stream and rebuffers it
//! into full frames. `StreamEncoder` and `StreamDecoder` bundle them with
//! the codec so callers push arbitrary-length sample runs and sound units.

use crate::bitstream::{deserialize_frame, serialize_frame};
use crate::decoder::Atrac1Decoder;
use crate::encoder::{Atrac1Encoder, EncoderOptions};
use crate::types::{CODEC_DELAY, NUM_SAMPLES, SOUND_UNIT_SIZE};
use crate::Result;

/// Accumulates PCM pushes into whole encoder frames
pub struct FrameChunker {
    pending: Vec<f32>,
    total_pushed: usize,
}

impl FrameChunker {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(NUM_SAMPLES),
            total_pushed: 0,
        }
    }

    /// Add samples, returning every full frame that became available
    pub fn push(&mut self, samples: &[f32]) -> Vec<[f32; NUM_SAMPLES]> {
        self.total_pushed += samples.len();
        self.pending.extend_from_slice(samples);
        let mut frames = Vec::new();
        while self.pending.len() >= NUM_SAMPLES {
            let mut frame = [0.0f32; NUM_SAMPLES];
            frame.copy_from_slice(&self.pending[..NUM_SAMPLES]);
            self.pending.drain(..NUM_SAMPLES);
            frames.push(frame);
        }
        frames
    }

    /// Finish the stream: zero-pad the partial tail frame and, when the
    /// padding cannot cover the codec delay, append one extra silent frame
    /// so the decoder can emit every real sample.
    pub fn flush(&mut self) -> Vec<[f32; NUM_SAMPLES]> {
        let mut frames = Vec::new();
        if self.total_pushed == 0 {
            return frames;
        }
        let padding = if self.pending.is_empty() {
            0
        } else {
            NUM_SAMPLES - self.pending.len()
        };
        if !self.pending.is_empty() {
            let mut frame = [0.0f32; NUM_SAMPLES];
            frame[..self.pending.len()].copy_from_slice(&self.pending);
            self.pending.clear();
            frames.push(frame);
        }
        if padding < CODEC_DELAY {
            frames.push([0.0f32; NUM_SAMPLES]);
        }
        frames
    }
}

impl Default for FrameChunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops the codec delay from the decoded stream and re-frames it
pub struct DelayCompensator {
    remaining_to_drop: usize,
    pending: Vec<f32>,
}

impl DelayCompensator {
    pub fn new() -> Self {
        Self {
            remaining_to_drop: CODEC_DELAY,
            pending: Vec::with_capacity(NUM_SAMPLES),
        }
    }

    /// Add decoded samples, returning every full output frame
    pub fn push(&mut self, samples: &[f32]) -> Vec<[f32; NUM_SAMPLES]> {
        let skip = self.remaining_to_drop.min(samples.len());
        self.remaining_to_drop -= skip;
        self.pending.extend_from_slice(&samples[skip..]);

        let mut frames = Vec::new();
        while self.pending.len() >= NUM_SAMPLES {
            let mut frame = [0.0f32; NUM_SAMPLES];
            frame.copy_from_slice(&self.pending[..NUM_SAMPLES]);
            self.pending.drain(..NUM_SAMPLES);
            frames.push(frame);
        }
        frames
    }

    /// Return the remaining tail (shorter than one frame)
    pub fn finish(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.pending)
    }
}

impl Default for DelayCompensator {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental encoder: arbitrary PCM pushes in, serialized units out.
///
/// Couples one `Atrac1Encoder` with a `FrameChunker` so callers never deal
/// with frame boundaries themselves.
pub struct StreamEncoder {
    encoder: Atrac1Encoder,
    chunker: FrameChunker,
}

impl StreamEncoder {
    pub fn new() -> Self {
        Self {
            encoder: Atrac1Encoder::new(),
            chunker: FrameChunker::new(),
        }
    }

    pub fn with_options(options: EncoderOptions) -> Result<Self> {
        Ok(Self {
            encoder: Atrac1Encoder::with_options(options)?,
            chunker: FrameChunker::new(),
        })
    }

    /// Feed samples, receiving every sound unit that became complete
    pub fn push_samples(&mut self, samples: &[f32]) -> Result<Vec<[u8; SOUND_UNIT_SIZE]>> {
        let mut units = Vec::new();
        for frame in self.chunker.push(samples) {
            units.push(serialize_frame(&self.encoder.encode_frame(&frame)?));
        }
        Ok(units)
    }

    /// Finish the stream: pad the tail and emit the flush unit(s)
    pub fn finish(&mut self) -> Result<Vec<[u8; SOUND_UNIT_SIZE]>> {
        let mut units = Vec::new();
        for frame in self.chunker.flush() {
            units.push(serialize_frame(&self.encoder.encode_frame(&frame)?));
        }
        Ok(units)
    }
}

impl Default for StreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental decoder: sound units in, delay-compensated PCM out
pub struct StreamDecoder {
    decoder: Atrac1Decoder,
    compensator: DelayCompensator,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            decoder: Atrac1Decoder::new(),
            compensator: DelayCompensator::new(),
        }
    }

    /// Decode one 212-byte unit, receiving any full output frames
    pub fn push_unit(&mut self, unit: &[u8]) -> Result<Vec<f32>> {
        let frame = deserialize_frame(unit)?;
        let pcm = self.decoder.decode_frame(&frame)?;
        let mut samples = Vec::new();
        for out in self.compensator.push(&pcm) {
            samples.extend_from_slice(&out);
        }
        Ok(samples)
    }

    /// Drain the buffered tail after the last unit
    pub fn finish(&mut self) -> Vec<f32> {
        self.compensator.finish()
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunker_slices_full_frames() {
        let mut chunker = FrameChunker::new();
        let frames = chunker.push(&vec![0.5; NUM_SAMPLES * 2 + 100]);
        assert_eq!(frames.len(), 2);
        let tail = chunker.flush();
        // 100 pending samples leave 412 samples of padding, which exceeds
        // the codec delay, so no extra frame is appended.
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0][99], 0.5);
        assert_eq!(tail[0][100], 0.0);
    }

    #[test]
    fn test_chunker_appends_flush_frame_when_padding_is_short() {
        let mut chunker = FrameChunker::new();
        // 500 pending samples leave only 12 samples of padding.
        chunker.push(&vec![0.1; 500]);
        let tail = chunker.flush();
        assert_eq!(tail.len(), 2, "short padding requires an extra silent frame");
        assert!(tail[1].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_chunker_exact_multiple_still_flushes_delay_frame() {
        let mut chunker = FrameChunker::new();
        let frames = chunker.push(&vec![0.2; NUM_SAMPLES]);
        assert_eq!(frames.len(), 1);
        let tail = chunker.flush();
        assert_eq!(tail.len(), 1, "zero padding still cannot cover the delay");
    }

    #[test]
    fn test_chunker_empty_stream_flushes_nothing() {
        let mut chunker = FrameChunker::new();
        assert!(chunker.flush().is_empty());
    }

    #[test]
    fn test_delay_compensator_drops_codec_delay() {
        let mut comp = DelayCompensator::new();
        let input: Vec<f32> = (0..NUM_SAMPLES * 3).map(|i| i as f32).collect();
        let mut output = Vec::new();
        for frame in input.chunks(NUM_SAMPLES) {
            for f in comp.push(frame) {
                output.extend_from_slice(&f);
            }
        }
        output.extend(comp.finish());
        assert_eq!(output.len(), NUM_SAMPLES * 3 - CODEC_DELAY);
        assert_eq!(output[0], CODEC_DELAY as f32, "first surviving sample");
    }

    #[test]
    fn test_stream_pair_round_trip_lengths() {
        let mut encoder = StreamEncoder::new();
        let mut decoder = StreamDecoder::new();

        let input = vec![0.0f32; NUM_SAMPLES * 2 + 300];
        let mut units = encoder.push_samples(&input).unwrap();
        units.extend(encoder.finish().unwrap());
        // 2 full frames, one padded tail (padding 212 < delay) and the
        // extra flush frame.
        assert_eq!(units.len(), 4);

        let mut output = Vec::new();
        for unit in &units {
            output.extend(decoder.push_unit(unit).unwrap());
        }
        output.extend(decoder.finish());
        assert_eq!(output.len(), units.len() * NUM_SAMPLES - CODEC_DELAY);
        assert!(output.len() >= input.len());
    }

    #[test]
    fn test_stream_decoder_rejects_bad_unit_size() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push_unit(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_delay_compensator_output_framing() {
        let mut comp = DelayCompensator::new();
        let frames = comp.push(&vec![1.0; NUM_SAMPLES]);
        assert!(frames.is_empty(), "first frame is shorter than the delay");
        let frames = comp.push(&vec![1.0; NUM_SAMPLES]);
        assert_eq!(frames.len(), 1);
        let tail = comp.finish();
        assert_eq!(tail.len(), 2 * NUM_SAMPLES - CODEC_DELAY - NUM_SAMPLES);
    }
}
