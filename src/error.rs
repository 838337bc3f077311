//! Error types for the ATRAC1 codec
//!
//! This module defines all error types used throughout the codec,
//! providing detailed error information for different failure scenarios.

use thiserror::Error;

/// Main error type for the ATRAC1 codec
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoder option validation errors
    #[error("Option error: {0}")]
    Options(#[from] OptionsError),

    /// Encoded frame validation errors
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// AEA container errors
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Transform precondition errors
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// I/O errors from the file layer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV read/write errors
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Encoder option validation errors
#[derive(Debug, Error)]
pub enum OptionsError {
    /// Transient detection threshold outside its valid range
    #[error("Transient threshold {name} = {value} out of range [{min}, {max}]")]
    ThresholdOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Encoded frame validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Encoded buffer length is not exactly one sound unit
    #[error("Invalid frame size: expected {expected} bytes, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },
}

/// AEA container errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerError {
    /// Header magic does not identify an AEA stream
    #[error("Invalid AEA magic: expected 00 08 00 00, found {found:02x?}")]
    InvalidMagic { found: [u8; 4] },

    /// Title is not representable in the header
    #[error("Invalid title: {reason}")]
    InvalidTitle { reason: String },

    /// Channel count outside the supported set {1, 2}
    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(u8),

    /// Stream ended before the expected number of bytes
    #[error("Truncated stream: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Transform precondition errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    /// FFT length must be a power of two
    #[error("FFT length {0} is not a power of two")]
    NotPowerOfTwo(usize),

    /// Real and imaginary buffers must have equal length
    #[error("FFT buffer length mismatch: re {re}, im {im}")]
    LengthMismatch { re: usize, im: usize },
}

/// Specialized result types for different modules
pub type OptionsResult<T> = std::result::Result<T, OptionsError>;
pub type FrameResult<T> = std::result::Result<T, FrameError>;
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;
pub type TransformResult<T> = std::result::Result<T, TransformError>;
