//! Error types for norseq

use thiserror::Error;

/// Result type alias for norseq operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for norseq
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad magic number or unparseable header
    #[error("Format error: {0}")]
    Format(String),

    /// Header parsed but carries unusable geometry
    #[error("Invalid header: {0}")]
    HeaderInvalid(String),

    /// Short read for a frame payload
    #[error("Incomplete frame data: need {need} bytes, have {have}")]
    DataIncomplete { need: usize, have: usize },

    /// Bit depth outside the supported set {8, 16, 24}
    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u32),

    /// Compressed sequences are not handled
    #[error("Unsupported compression format: {0}")]
    UnsupportedCompression(u32),

    /// Region of interest does not fit inside the source image
    #[error("ROI out of bounds: {0}")]
    RoiOutOfBounds(String),

    /// Frame index outside [0, frame_count)
    #[error("Frame index {index} out of range (frame count {count})")]
    IndexOutOfRange { index: u32, count: u32 },

    /// Buffer dimensions do not match the sequence geometry
    #[error("Dimension mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    /// Operation cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create an invalid-header error
    pub fn header_invalid<S: Into<String>>(msg: S) -> Self {
        Error::HeaderInvalid(msg.into())
    }

    /// Create an ROI bounds error
    pub fn roi_out_of_bounds<S: Into<String>>(msg: S) -> Self {
        Error::RoiOutOfBounds(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Error::InvalidState(msg.into())
    }
}
