//! CI-V frame model and streaming frame codec
//!
//! # Frame Format
//! ```text
//! FE FE [dest] [src] [cmd] [data...] FD
//! ```
//!
//! The preamble is stripped by [`FrameCodec`]; a [`CivFrame`] starts at the
//! destination address and keeps the terminator at the end of its data so
//! the BCD decoder can find the end of a frequency field.

use crate::error::ParseError;

/// CI-V frame preamble byte
pub const PREAMBLE: u8 = 0xFE;
/// CI-V frame terminator byte
pub const TERMINATOR: u8 = 0xFD;
/// Positive acknowledgment status byte
pub const OK: u8 = 0xFB;
/// Negative acknowledgment status byte
pub const NOT_GOOD: u8 = 0xFA;
/// Separator between the two halves of a band-edge reply
pub const SEPARATOR: u8 = 0x2D;
/// Address this rig answers to
pub const RIG_ADDRESS: u8 = 0xA1;
/// Default controller address
pub const CONTROLLER_ADDRESS: u8 = 0xE0;
/// Destination every rig on the bus accepts
pub const BROADCAST_ADDRESS: u8 = 0x00;

/// Receive queue bound, preamble included
pub const MAX_FRAME_LEN: usize = 20;

/// One received or outgoing CI-V frame, preamble excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CivFrame {
    /// Destination address
    pub dest: u8,
    /// Source address
    pub src: u8,
    /// Command code
    pub command: u8,
    /// Sub-command and payload bytes followed by the terminator
    data: Vec<u8>,
}

impl CivFrame {
    /// Build a frame from its payload; the terminator is appended
    pub fn new(dest: u8, src: u8, command: u8, payload: &[u8]) -> Self {
        let mut data = Vec::with_capacity(payload.len() + 1);
        data.extend_from_slice(payload);
        data.push(TERMINATOR);
        Self {
            dest,
            src,
            command,
            data,
        }
    }

    /// Build a controller-to-rig frame
    pub fn to_rig(command: u8, payload: &[u8]) -> Self {
        Self::new(RIG_ADDRESS, CONTROLLER_ADDRESS, command, payload)
    }

    /// Parse `[dest, src, cmd, data..., FD]` with the preamble already removed
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        // Minimum frame: dest src cmd FD = 4 bytes
        if bytes.len() < 4 {
            return Err(ParseError::Incomplete {
                needed: 4 - bytes.len(),
            });
        }

        if bytes[bytes.len() - 1] != TERMINATOR {
            return Err(ParseError::MalformedFrame("missing terminator".into()));
        }

        Ok(Self {
            dest: bytes[0],
            src: bytes[1],
            command: bytes[2],
            data: bytes[3..].to_vec(),
        })
    }

    /// Sub-command and payload, terminator excluded
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.data.len().saturating_sub(1)]
    }

    /// Sub-command and payload with the closing terminator
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload byte at `index`, if present
    pub fn arg(&self, index: usize) -> Option<u8> {
        self.payload().get(index).copied()
    }

    /// Encode to wire bytes, preamble included
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.data.len());
        out.extend_from_slice(&[PREAMBLE, PREAMBLE, self.dest, self.src, self.command]);
        out.extend_from_slice(&self.data);
        out
    }
}

/// Streaming CI-V frame codec
///
/// Bytes arrive in arbitrary chunks from a serial line; complete frames are
/// handed out one at a time. Garbage before a preamble is discarded and a
/// frame that outgrows [`MAX_FRAME_LEN`] is dropped.
pub struct FrameCodec {
    buffer: Vec<u8>,
}

impl FrameCodec {
    /// Create a new frame codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_FRAME_LEN * 2),
        }
    }

    /// Append received bytes
    ///
    /// Nothing is discarded here; complete frames stay queued until
    /// [`next_frame`](Self::next_frame) hands them out, and that is where
    /// noise and unterminated frames are dropped.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<CivFrame> {
        loop {
            match self.try_next()? {
                Ok(frame) => return Some(frame),
                Err(e) => tracing::warn!("Dropping CI-V frame: {}", e),
            }
        }
    }

    /// Discard any buffered bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes waiting for a terminator
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn find_preamble(&self) -> Option<usize> {
        self.buffer
            .windows(2)
            .position(|w| w[0] == PREAMBLE && w[1] == PREAMBLE)
    }

    /// `None` when more bytes are needed, `Some(Err)` for a dropped frame
    fn try_next(&mut self) -> Option<Result<CivFrame, ParseError>> {
        let Some(preamble_pos) = self.find_preamble() else {
            // Keep a trailing lone FE, it may start the next preamble
            let keep = usize::from(self.buffer.last() == Some(&PREAMBLE));
            let drop = self.buffer.len() - keep;
            self.buffer.drain(..drop);
            return None;
        };
        if preamble_pos > 0 {
            self.buffer.drain(..preamble_pos);
        }

        // Some controllers send more than two preamble bytes
        let body_start = self
            .buffer
            .iter()
            .position(|&b| b != PREAMBLE)
            .unwrap_or(self.buffer.len());

        match self.buffer.iter().position(|&b| b == TERMINATOR) {
            Some(term_pos) if term_pos < MAX_FRAME_LEN => {
                let frame: Vec<u8> = self.buffer.drain(..=term_pos).collect();
                Some(CivFrame::from_bytes(&frame[body_start..]))
            }
            Some(_) => {
                self.drop_oversized();
                Some(Err(ParseError::FrameTooLong {
                    limit: MAX_FRAME_LEN,
                }))
            }
            None if self.buffer.len() >= MAX_FRAME_LEN => {
                self.drop_oversized();
                Some(Err(ParseError::FrameTooLong {
                    limit: MAX_FRAME_LEN,
                }))
            }
            None => None,
        }
    }

    /// Skip past the current preamble so the search resumes after it
    fn drop_oversized(&mut self) {
        let skip = self
            .buffer
            .iter()
            .position(|&b| b != PREAMBLE)
            .unwrap_or(self.buffer.len());
        self.buffer.drain(..skip);
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}
