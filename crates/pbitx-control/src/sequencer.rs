//! TX/RX sequencer
//!
//! Transmit is entered from three places: the PTT line and the CW keyer
//! (both [`PttTrigger::Hardware`]) and CI-V (`PttTrigger::Soft`). A soft
//! transmission latches so that a released PTT line cannot end it, and a
//! CI-V "transmit off" cannot end a PTT transmission.

use tracing::{debug, info};

use crate::hal::OutputLine;
use crate::state::{RadioState, TransmitSnapshot};

/// Who asked for the transmit change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttTrigger {
    /// PTT line or CW keyer
    Hardware,
    /// CI-V command
    Soft,
}

/// Transmit low-pass filter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterBand {
    /// Above 21 MHz: 30 MHz low-pass, all relays off
    Band1,
    /// 14 MHz up to 21 MHz
    Band2,
    /// Above 7 MHz, below 14 MHz
    Band3,
    /// 7 MHz and below
    Band4,
}

impl FilterBand {
    pub fn for_frequency(hz: u32) -> Self {
        if hz > 21_000_000 {
            FilterBand::Band1
        } else if hz >= 14_000_000 {
            FilterBand::Band2
        } else if hz > 7_000_000 {
            FilterBand::Band3
        } else {
            FilterBand::Band4
        }
    }

    /// Relay levels for LPF A, B and C
    pub fn relays(self) -> [(OutputLine, bool); 3] {
        let (a, b, c) = match self {
            FilterBand::Band1 => (false, false, false),
            FilterBand::Band2 => (true, false, false),
            FilterBand::Band3 => (false, true, false),
            FilterBand::Band4 => (false, false, true),
        };
        [
            (OutputLine::LpfA, a),
            (OutputLine::LpfB, b),
            (OutputLine::LpfC, c),
        ]
    }
}

impl RadioState {
    /// Switch to transmit
    ///
    /// With RIT on, the receive frequency is remembered and the RIT transmit
    /// frequency goes live. Otherwise, with split on, the other VFO goes
    /// live. Returns `true` when the rig changed state and the caller must
    /// key the T/R relay and re-apply the frequency. Entering while already
    /// transmitting only latches a soft trigger.
    pub fn enter_transmit(&mut self, trigger: PttTrigger) -> bool {
        if trigger == PttTrigger::Soft {
            self.soft_ptt_latched = true;
        }
        if self.in_transmit {
            debug!(?trigger, "Already transmitting");
            return false;
        }

        self.in_transmit = true;
        self.pre_transmit = Some(TransmitSnapshot {
            active_vfo: self.active_vfo,
            live: self.live,
        });

        if self.rit_enabled {
            self.rit_rx_frequency = self.live.frequency_hz;
            self.live.frequency_hz = self.rit_tx_frequency;
        } else if self.split_enabled {
            self.sync_active();
            self.active_vfo = self.active_vfo.other();
            self.live = self.channel(self.active_vfo);
        }

        info!(?trigger, hz = self.live.frequency_hz, "Transmit on");
        true
    }

    /// Return to receive if `trigger` matches how transmit was entered
    ///
    /// Returns `true` when the rig went back to receive.
    pub fn leave_transmit(&mut self, trigger: PttTrigger) -> bool {
        let allowed = match trigger {
            PttTrigger::Hardware => !self.soft_ptt_latched,
            PttTrigger::Soft => self.soft_ptt_latched,
        };
        if !allowed || !self.in_transmit {
            debug!(?trigger, latched = self.soft_ptt_latched, "Transmit off ignored");
            return false;
        }

        self.in_transmit = false;
        self.soft_ptt_latched = false;
        let snapshot = self.pre_transmit.take();

        if self.rit_enabled {
            self.live.frequency_hz = self.rit_rx_frequency;
        } else if let Some(snapshot) = snapshot {
            if snapshot.active_vfo != self.active_vfo {
                self.sync_active();
            }
            self.active_vfo = snapshot.active_vfo;
            self.live = snapshot.live;
        }

        info!(?trigger, hz = self.live.frequency_hz, "Transmit off");
        true
    }

    /// Start RIT with `tx_hz` as the transmit frequency
    pub fn rit_enable(&mut self, tx_hz: u32) {
        self.rit_enabled = true;
        self.rit_tx_frequency = tx_hz;
    }

    /// Stop RIT; returns `true` when the live frequency moved back
    pub fn rit_disable(&mut self) -> bool {
        if !self.rit_enabled {
            return false;
        }
        self.rit_enabled = false;
        self.live.frequency_hz = self.rit_tx_frequency;
        true
    }

    pub fn set_split(&mut self, enabled: bool) {
        self.split_enabled = enabled;
    }
}
