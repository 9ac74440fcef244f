//! VFO manager
//!
//! Two stored channels plus the live view of the active one. Tuning only
//! touches the live view; the store is written when the operator switches
//! VFOs or something explicitly saves, which keeps flash wear bounded.

use pbitx_protocol::{OperatingMode, Vfo};
use tracing::{debug, info};

use crate::error::ControlError;
use crate::state::{RadioState, VfoChannel, DEFAULT_VFO_A_HZ, DEFAULT_VFO_B_HZ};
use crate::store::{decode_mode, encode_mode, keys, PersistentStore};
use crate::synth;

/// Stored frequencies outside this window are replaced at boot
pub const BOOT_WINDOW_HZ: std::ops::RangeInclusive<u32> = 3_500_000..=35_000_000;

impl RadioState {
    /// Restore both channels from the store, substituting defaults
    ///
    /// Frequencies outside 3.5-35 MHz fall back to 7.150 MHz (A) and
    /// 14.150 MHz (B). A missing mode is derived from the channel's
    /// frequency: USB above 10 MHz, LSB below.
    pub fn restore(store: &dyn PersistentStore) -> Self {
        let vfo_a = restore_channel(store, keys::VFO_A, keys::VFO_A_MODE, DEFAULT_VFO_A_HZ);
        let vfo_b = restore_channel(store, keys::VFO_B, keys::VFO_B_MODE, DEFAULT_VFO_B_HZ);
        debug!(?vfo_a, ?vfo_b, "Restored VFOs");
        Self::new(vfo_a, vfo_b)
    }

    /// Make `which` the active channel
    ///
    /// Returns `true` when the live frequency changed and the synthesizer
    /// needs an update. Selecting the already-active channel is a no-op.
    pub fn select_vfo(&mut self, which: Vfo, store: &mut dyn PersistentStore) -> bool {
        if which == self.active_vfo {
            return false;
        }

        let outgoing = self.active_vfo;
        self.sync_active();
        let (freq_key, mode_key) = channel_keys(outgoing);
        store.put(freq_key, self.live.frequency_hz);
        store.put(mode_key, encode_mode(self.live.mode));

        self.active_vfo = which;
        self.live = self.channel(which);
        self.save_vfos(store);

        info!("Selected {} at {} Hz {}", which, self.live.frequency_hz, self.live.mode);
        true
    }

    /// Copy the other channel's current values into `target`
    ///
    /// Returns `true` when `target` is the active channel, i.e. the live
    /// frequency changed.
    pub fn equalize(&mut self, target: Vfo) -> bool {
        let source = self.current(target.other());
        *self.channel_mut(target) = source;
        debug!("Equalized {} from {}", target, target.other());

        if target == self.active_vfo {
            self.live = source;
            true
        } else {
            false
        }
    }

    /// Exchange the stored frequencies of A and B
    ///
    /// With A active the new A frequency becomes live. With B active, A is
    /// made active afterwards and loaded as a whole. Modes stay with their
    /// channels.
    pub fn swap(&mut self) {
        self.sync_active();
        std::mem::swap(&mut self.vfo_a.frequency_hz, &mut self.vfo_b.frequency_hz);

        match self.active_vfo {
            Vfo::A => self.live.frequency_hz = self.vfo_a.frequency_hz,
            Vfo::B => {
                self.active_vfo = Vfo::A;
                self.live = self.vfo_a;
            }
        }
        debug!("Swapped VFOs, live {} Hz on {}", self.live.frequency_hz, self.active_vfo);
    }

    /// Copy the active channel into the other one (A=B)
    ///
    /// Split and RIT are turned off. The caller persists and re-applies.
    pub fn reset_vfos(&mut self) {
        let live = self.live;
        *self.channel_mut(self.active_vfo.other()) = live;
        self.split_enabled = false;
        self.rit_enabled = false;
    }

    /// Tune the live view
    pub fn set_live_frequency(&mut self, hz: u32) -> Result<(), ControlError> {
        if !synth::is_supported(hz) {
            return Err(ControlError::FrequencyOutOfRange { hz });
        }
        self.live.frequency_hz = hz;
        Ok(())
    }

    /// Change the live mode
    pub fn set_live_mode(&mut self, mode: OperatingMode) {
        self.live.mode = mode;
    }

    /// Write both channels to the store, live values for the active one
    pub fn save_vfos(&self, store: &mut dyn PersistentStore) {
        for which in [Vfo::A, Vfo::B] {
            let channel = self.current(which);
            let (freq_key, mode_key) = channel_keys(which);
            store.put(freq_key, channel.frequency_hz);
            store.put(mode_key, encode_mode(channel.mode));
        }
    }
}

fn channel_keys(which: Vfo) -> (u16, u16) {
    match which {
        Vfo::A => (keys::VFO_A, keys::VFO_A_MODE),
        Vfo::B => (keys::VFO_B, keys::VFO_B_MODE),
    }
}

fn restore_channel(store: &dyn PersistentStore, freq_key: u16, mode_key: u16, default_hz: u32) -> VfoChannel {
    let stored = store.get(freq_key);
    let frequency_hz = if BOOT_WINDOW_HZ.contains(&stored) {
        stored
    } else {
        default_hz
    };
    let mode = decode_mode(store.get(mode_key))
        .unwrap_or_else(|| OperatingMode::sideband_for(frequency_hz));
    VfoChannel::new(frequency_hz, mode)
}
