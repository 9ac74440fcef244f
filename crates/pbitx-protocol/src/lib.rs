//! pBitx CI-V Protocol Library
//!
//! This crate provides the wire-level pieces of the pBitx CAT interface:
//!
//! - **BCD frequency codec**: packed decimal digits, least significant first
//! - **CI-V frames**: `FE FE [dest] [src] [cmd] [data...] FD`
//! - **Streaming frame codec** that handles partial serial reads
//! - **Command codes** and the operating modes the rig supports
//!
//! # Example
//!
//! ```rust
//! use pbitx_protocol::{decode_frequency, encode_frequency, FrameCodec, TERMINATOR};
//!
//! let mut codec = FrameCodec::new();
//! codec.push_bytes(&[0xFE, 0xFE, 0xA1, 0xE0, 0x05, 0x00, 0x00, 0x07, 0x14, 0x00, 0xFD]);
//!
//! let frame = codec.next_frame().unwrap();
//! assert_eq!(decode_frequency(frame.data(), TERMINATOR), Ok(14_070_000));
//! assert_eq!(encode_frequency(14_070_000), [0x00, 0x00, 0x07, 0x14, 0x00]);
//! ```

pub mod bcd;
pub mod command;
pub mod error;
pub mod frame;

pub use bcd::{decode_frequency, encode_frequency, FREQUENCY_BYTES};
pub use command::{vfo_op, CommandCode, OperatingMode, Vfo, COMMAND_SPACE};
pub use error::ParseError;
pub use frame::{
    CivFrame, FrameCodec, BROADCAST_ADDRESS, CONTROLLER_ADDRESS, MAX_FRAME_LEN, NOT_GOOD, OK, PREAMBLE, RIG_ADDRESS,
    SEPARATOR, TERMINATOR,
};
