//! Error types for the control core

use thiserror::Error;

use pbitx_protocol::ParseError;

/// Errors raised by radio state operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// Frequency outside what the synthesizer can produce
    #[error("frequency {hz} Hz outside 500 kHz..109 MHz")]
    FrequencyOutOfRange { hz: u32 },

    /// Operation not allowed while transmitting
    #[error("operation not allowed while transmitting")]
    Transmitting,
}

/// Errors a CI-V handler can return; every variant is answered with NG
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Command code has no handler
    #[error("unsupported command 0x{0:02X}")]
    UnsupportedCommand(u8),

    /// Handler refused the request
    #[error("command 0x{command:02X} rejected: {reason}")]
    HandlerRejected {
        /// Command code
        command: u8,
        /// Why the handler refused
        reason: String,
    },

    /// Payload could not be decoded
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Radio state refused the change
    #[error("control error: {0}")]
    Control(#[from] ControlError),
}

impl DispatchError {
    pub(crate) fn rejected(command: u8, reason: impl Into<String>) -> Self {
        DispatchError::HandlerRejected {
            command,
            reason: reason.into(),
        }
    }
}
