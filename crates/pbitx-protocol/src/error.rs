//! Error types for CI-V frame parsing and frequency encoding

use thiserror::Error;

/// Errors that can occur while parsing protocol data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer is incomplete - need more data
    #[error("incomplete data: need {needed} more bytes")]
    Incomplete { needed: usize },

    /// Frame structure is wrong or the terminator is missing
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Frame grew past the receive buffer bound without a terminator
    #[error("frame exceeds {limit} bytes without terminator")]
    FrameTooLong { limit: usize },

    /// Invalid BCD encoding
    #[error("invalid BCD digit: 0x{0:02X}")]
    InvalidBcd(u8),

    /// Decoded digits do not fit a 32-bit frequency
    #[error("frequency does not fit in 32 bits")]
    FrequencyOverflow,

    /// Mode byte outside the supported set
    #[error("invalid mode: 0x{0:02X}")]
    InvalidMode(u8),
}
