//! Error types for the analysis pipeline.

use specflow_core::CoreError;
use thiserror::Error;

/// Result alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while configuring or running the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Block size must be at least one sample
    #[error("invalid block size {0}: must be > 0")]
    InvalidBlockSize(usize),

    /// Hop size out of range
    #[error("invalid hop size {hop}: must be in 1..={block}")]
    InvalidHopSize {
        /// Requested hop.
        hop: usize,
        /// Block size the hop was checked against.
        block: usize,
    },

    /// Element stride (channel count) must be at least one
    #[error("invalid stride {0}: must be > 0")]
    InvalidStride(usize),

    /// Sample rate must be positive
    #[error("invalid sample rate {0} Hz")]
    InvalidSampleRate(u32),

    /// Channel count outside the supported range
    #[error("invalid channel count {0}: expected 1 or 2")]
    InvalidChannels(u16),

    /// Frequency bounds malformed or beyond Nyquist
    #[error("invalid frequency range {min}..{max} Hz (nyquist {nyquist} Hz)")]
    InvalidFrequencyRange {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
        /// Half the sample rate.
        nyquist: f64,
    },

    /// Decibel range must be positive and finite
    #[error("invalid max dB {0}: must be > 0")]
    InvalidMaxDb(f64),

    /// Move speed must divide the block into at least one sample
    #[error("invalid move speed {move_speed} for block size {block_size}")]
    InvalidMoveSpeed {
        /// Requested hop divisor.
        move_speed: usize,
        /// Block size being divided.
        block_size: usize,
    },

    /// Destination or source slice too small
    #[error("buffer too short: need {required} elements, got {actual}")]
    BufferTooShort {
        /// Elements the operation needs.
        required: usize,
        /// Elements supplied.
        actual: usize,
    },

    /// Capture payload is not a whole number of interleaved frames
    #[error("capture buffer of {bytes} bytes is not a multiple of the {frame_bytes}-byte frame")]
    MisalignedCapture {
        /// Byte count delivered.
        bytes: usize,
        /// Bytes per interleaved frame.
        frame_bytes: usize,
    },

    /// Capture source format differs from the analyzer settings
    #[error(
        "capture format {actual_rate} Hz x{actual_channels} does not match analyzer {expected_rate} Hz x{expected_channels}"
    )]
    FormatMismatch {
        /// Analyzer sample rate.
        expected_rate: u32,
        /// Source sample rate.
        actual_rate: u32,
        /// Analyzer channel count.
        expected_channels: u16,
        /// Source channel count.
        actual_channels: u16,
    },

    /// Plan used after release
    #[error("transform plan used after release")]
    PlanReleased,

    /// Capture source failure
    #[error("capture source error: {0}")]
    Capture(String),

    /// Core primitive error
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AnalysisError {
    /// Create a buffer-too-short error.
    pub fn buffer_too_short(required: usize, actual: usize) -> Self {
        AnalysisError::BufferTooShort { required, actual }
    }
}
