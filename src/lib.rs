//! # ATRAC1 codec
//!
//! A pure Rust implementation of the ATRAC1 perceptual audio codec as used
//! by MiniDisc hardware and AEA files: 44.1 kHz PCM in 512-sample frames to
//! fixed 212-byte sound units and back. Channels are coded independently;
//! stereo streams interleave one unit per channel.

pub mod aea;
pub mod bitalloc;
pub mod bitstream;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod fft;
pub mod mdct;
pub mod pcm_utils;
pub mod psycho;
pub mod qmf;
pub mod quantization;
pub mod streaming;
pub mod tables;
pub mod transient;
pub mod types;
pub mod wav;

pub use aea::AeaHeader;
pub use bitstream::{deserialize_frame, serialize_frame};
pub use decoder::Atrac1Decoder;
pub use encoder::{Atrac1Encoder, EncoderOptions};
pub use error::CodecError;
pub use streaming::{DelayCompensator, FrameChunker, StreamDecoder, StreamEncoder};
pub use types::{BlockSizeMode, EncodedFrame, CODEC_DELAY, NUM_SAMPLES, SOUND_UNIT_SIZE};

/// Convenience result type for codec operations
pub type Result<T> = std::result::Result<T, error::CodecError>;
