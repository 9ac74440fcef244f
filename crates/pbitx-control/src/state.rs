//! Radio state
//!
//! One owned [`RadioState`] holds everything the VFO manager and the
//! TX/RX sequencer mutate. The transmit flags are only changed by
//! [`RadioState::enter_transmit`] and [`RadioState::leave_transmit`].

use pbitx_protocol::{OperatingMode, Vfo};
use serde::{Deserialize, Serialize};

/// Boot default for VFO A
pub const DEFAULT_VFO_A_HZ: u32 = 7_150_000;
/// Boot default for VFO B
pub const DEFAULT_VFO_B_HZ: u32 = 14_150_000;

/// One tuning channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfoChannel {
    /// Frequency in Hz
    pub frequency_hz: u32,
    /// Operating mode
    pub mode: OperatingMode,
}

impl VfoChannel {
    pub fn new(frequency_hz: u32, mode: OperatingMode) -> Self {
        Self { frequency_hz, mode }
    }
}

/// What to return to when a transmission ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransmitSnapshot {
    pub(crate) active_vfo: Vfo,
    pub(crate) live: VfoChannel,
}

/// Complete VFO and transmit state of the rig
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioState {
    pub(crate) active_vfo: Vfo,
    pub(crate) vfo_a: VfoChannel,
    pub(crate) vfo_b: VfoChannel,
    /// Live frequency/mode of the active channel; the stored channel is
    /// only updated on a VFO switch or save
    pub(crate) live: VfoChannel,
    pub(crate) split_enabled: bool,
    pub(crate) rit_enabled: bool,
    pub(crate) rit_tx_frequency: u32,
    pub(crate) rit_rx_frequency: u32,
    // Sequencer only
    pub(crate) in_transmit: bool,
    pub(crate) soft_ptt_latched: bool,
    pub(crate) pre_transmit: Option<TransmitSnapshot>,
}

impl RadioState {
    /// VFO A active and live
    pub fn new(vfo_a: VfoChannel, vfo_b: VfoChannel) -> Self {
        Self {
            active_vfo: Vfo::A,
            vfo_a,
            vfo_b,
            live: vfo_a,
            split_enabled: false,
            rit_enabled: false,
            rit_tx_frequency: 0,
            rit_rx_frequency: 0,
            in_transmit: false,
            soft_ptt_latched: false,
            pre_transmit: None,
        }
    }

    pub fn active_vfo(&self) -> Vfo {
        self.active_vfo
    }

    /// Stored values of a channel
    pub fn channel(&self, which: Vfo) -> VfoChannel {
        match which {
            Vfo::A => self.vfo_a,
            Vfo::B => self.vfo_b,
        }
    }

    pub(crate) fn channel_mut(&mut self, which: Vfo) -> &mut VfoChannel {
        match which {
            Vfo::A => &mut self.vfo_a,
            Vfo::B => &mut self.vfo_b,
        }
    }

    /// Current values of a channel: live for the active one, stored otherwise
    pub fn current(&self, which: Vfo) -> VfoChannel {
        if which == self.active_vfo {
            self.live
        } else {
            self.channel(which)
        }
    }

    /// Live frequency in Hz
    pub fn frequency_hz(&self) -> u32 {
        self.live.frequency_hz
    }

    /// Live operating mode
    pub fn mode(&self) -> OperatingMode {
        self.live.mode
    }

    pub fn live(&self) -> VfoChannel {
        self.live
    }

    pub fn split_enabled(&self) -> bool {
        self.split_enabled
    }

    pub fn rit_enabled(&self) -> bool {
        self.rit_enabled
    }

    /// Frequency RIT returns to for transmit
    pub fn rit_tx_frequency(&self) -> u32 {
        self.rit_tx_frequency
    }

    /// Receive frequency saved while transmitting with RIT on
    pub fn rit_rx_frequency(&self) -> u32 {
        self.rit_rx_frequency
    }

    pub fn in_transmit(&self) -> bool {
        self.in_transmit
    }

    pub fn soft_ptt_latched(&self) -> bool {
        self.soft_ptt_latched
    }

    /// Copy the live values into the active channel's stored slot
    pub(crate) fn sync_active(&mut self) {
        let live = self.live;
        *self.channel_mut(self.active_vfo) = live;
    }
}

impl Default for RadioState {
    fn default() -> Self {
        Self::new(
            VfoChannel::new(DEFAULT_VFO_A_HZ, OperatingMode::Lsb),
            VfoChannel::new(DEFAULT_VFO_B_HZ, OperatingMode::Usb),
        )
    }
}
