//! Radio configuration
//!
//! Board constants that differ between builds of the transceiver. User
//! settings (VFOs, keyer speed, calibration) live in the persistent store
//! instead.

use pbitx_protocol::RIG_ADDRESS;
use serde::{Deserialize, Serialize};

/// Hardware configuration for one rig
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// CI-V address the rig answers to
    pub rig_address: u8,
    /// Synthesizer reference crystal in Hz
    pub xtal_hz: u32,
    /// PLL multiplier; the VCO runs at `xtal_hz * vco_multiplier`
    pub vco_multiplier: u32,
    /// First IF in Hz
    pub first_if_hz: u32,
    /// Output drive per clock: 0=2mA 1=4mA 2=6mA 3=8mA
    pub clock_drive: [u8; 3],
}

impl RadioConfig {
    /// Nominal VCO frequency before calibration
    pub fn nominal_vco_hz(&self) -> u32 {
        self.xtal_hz.saturating_mul(self.vco_multiplier)
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            rig_address: RIG_ADDRESS,
            xtal_hz: 25_000_000,
            vco_multiplier: 35,
            first_if_hz: 45_005_000,
            clock_drive: [3, 3, 3],
        }
    }
}
