//! Persistent settings store
//!
//! Settings live in a small key/value store addressed by the same keys the
//! radio's EEPROM map uses. Every value is a `u32`; signed values are stored
//! by bit pattern.

use std::collections::BTreeMap;

use pbitx_protocol::OperatingMode;

/// Value an unwritten key reads back as (erased flash)
pub const ERASED: u32 = u32::MAX;

/// Store keys
pub mod keys {
    /// Carrier oscillator frequency
    pub const USB_CAL: u16 = 8;
    /// VFO A frequency
    pub const VFO_A: u16 = 16;
    /// VFO B frequency
    pub const VFO_B: u16 = 20;
    /// CW side-tone pitch in Hz
    pub const CW_SIDETONE: u16 = 24;
    /// CW speed setting
    pub const CW_SPEED: u16 = 28;
    /// Synthesizer VCO calibration offset
    pub const MASTER_CAL: u16 = 128;
    /// VFO A mode
    pub const VFO_A_MODE: u16 = 238;
    /// VFO B mode
    pub const VFO_B_MODE: u16 = 242;
    /// Keyer type: 0 straight, 1 semi-automatic, 2 iambic
    pub const CW_KEY_TYPE: u16 = 254;
}

/// Stored mode values
pub mod mode_value {
    pub const LSB: u32 = 2;
    pub const USB: u32 = 3;
    pub const CW: u32 = 4;
}

/// Last-write-wins key/value storage that survives power loss
pub trait PersistentStore {
    /// Read a value; unwritten keys return [`ERASED`]
    fn get(&self, key: u16) -> u32;

    /// Write a value
    fn put(&mut self, key: u16, value: u32);
}

/// Encode a mode for storage
pub fn encode_mode(mode: OperatingMode) -> u32 {
    match mode {
        OperatingMode::Lsb => mode_value::LSB,
        OperatingMode::Usb => mode_value::USB,
        OperatingMode::Cw => mode_value::CW,
    }
}

/// Decode a stored mode; anything unknown is treated as unset
pub fn decode_mode(value: u32) -> Option<OperatingMode> {
    match value {
        mode_value::LSB => Some(OperatingMode::Lsb),
        mode_value::USB => Some(OperatingMode::Usb),
        mode_value::CW => Some(OperatingMode::Cw),
        _ => None,
    }
}

/// In-memory store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: BTreeMap<u16, u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: u16) -> u32 {
        self.values.get(&key).copied().unwrap_or(ERASED)
    }

    fn put(&mut self, key: u16, value: u32) {
        self.values.insert(key, value);
    }
}
