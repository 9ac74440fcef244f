//! CI-V command codes, operating modes and VFO identifiers

use crate::error::ParseError;

/// Size of the command space served by the rig (0x00..=0x1F)
pub const COMMAND_SPACE: usize = 0x20;

/// CI-V command codes the rig answers with something other than NG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCode {
    /// Set frequency without a reply (0x00)
    SetFrequencyData = 0x00,
    /// Set mode without a reply (0x01)
    SetModeData = 0x01,
    /// Read band edge frequencies (0x02)
    ReadBandEdges = 0x02,
    /// Read displayed frequency (0x03)
    ReadFrequency = 0x03,
    /// Read operating mode (0x04)
    ReadMode = 0x04,
    /// Set operating frequency (0x05)
    SetFrequency = 0x05,
    /// Set mode and filter (0x06)
    SetModeFilter = 0x06,
    /// VFO select, equalize and swap (0x07)
    SelectVfo = 0x07,
    /// Split control (0x0F)
    Split = 0x0F,
    /// Read transceiver id (0x19)
    ReadRigId = 0x19,
    /// Transmit on/off (0x1C)
    Transmit = 0x1C,
}

impl CommandCode {
    /// Look up a command code
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::SetFrequencyData),
            0x01 => Some(Self::SetModeData),
            0x02 => Some(Self::ReadBandEdges),
            0x03 => Some(Self::ReadFrequency),
            0x04 => Some(Self::ReadMode),
            0x05 => Some(Self::SetFrequency),
            0x06 => Some(Self::SetModeFilter),
            0x07 => Some(Self::SelectVfo),
            0x0F => Some(Self::Split),
            0x19 => Some(Self::ReadRigId),
            0x1C => Some(Self::Transmit),
            _ => None,
        }
    }

    /// Short name for logging
    pub fn name(self) -> &'static str {
        match self {
            Self::SetFrequencyData => "set-frequency-data",
            Self::SetModeData => "set-mode-data",
            Self::ReadBandEdges => "read-band-edges",
            Self::ReadFrequency => "read-frequency",
            Self::ReadMode => "read-mode",
            Self::SetFrequency => "set-frequency",
            Self::SetModeFilter => "set-mode-filter",
            Self::SelectVfo => "select-vfo",
            Self::Split => "split",
            Self::ReadRigId => "read-rig-id",
            Self::Transmit => "transmit",
        }
    }
}

/// Sub-codes of the VFO command (0x07)
pub mod vfo_op {
    /// Select VFO A
    pub const SELECT_A: u8 = 0x00;
    /// Select VFO B
    pub const SELECT_B: u8 = 0x01;
    /// Copy the other VFO into A
    pub const EQUALIZE: u8 = 0xA0;
    /// Exchange A and B
    pub const SWAP: u8 = 0xB0;
}

/// Operating modes supported by the rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperatingMode {
    /// Lower sideband
    Lsb,
    /// Upper sideband
    #[default]
    Usb,
    /// Continuous wave
    Cw,
}

impl OperatingMode {
    /// CI-V mode byte
    pub fn civ_code(self) -> u8 {
        match self {
            OperatingMode::Lsb => 0x00,
            OperatingMode::Usb => 0x01,
            OperatingMode::Cw => 0x03,
        }
    }

    /// Sideband that suits `hz` (USB above 10 MHz)
    pub fn sideband_for(hz: u32) -> Self {
        if hz > 10_000_000 {
            OperatingMode::Usb
        } else {
            OperatingMode::Lsb
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperatingMode::Lsb => "LSB",
            OperatingMode::Usb => "USB",
            OperatingMode::Cw => "CW",
        }
    }
}

impl TryFrom<u8> for OperatingMode {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(OperatingMode::Lsb),
            0x01 => Ok(OperatingMode::Usb),
            0x03 => Ok(OperatingMode::Cw),
            other => Err(ParseError::InvalidMode(other)),
        }
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// VFO identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Vfo {
    #[default]
    A,
    B,
}

impl Vfo {
    /// The other channel
    pub fn other(self) -> Self {
        match self {
            Vfo::A => Vfo::B,
            Vfo::B => Vfo::A,
        }
    }
}

impl std::fmt::Display for Vfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vfo::A => f.write_str("VFO A"),
            Vfo::B => f.write_str("VFO B"),
        }
    }
}
