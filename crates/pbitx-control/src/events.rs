//! Rig events
//!
//! The [`Rig`](crate::Rig) records what it did to the hardware as a list of
//! events. Callers drain them after each tick or frame, e.g. to broadcast
//! state to a UI.

use pbitx_protocol::{OperatingMode, Vfo};

use crate::keyer::{Element, KeyerMode};
use crate::sequencer::{FilterBand, PttTrigger};
use crate::synth::ClockPlan;

/// Something observable changed on the rig
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigEvent {
    /// Synthesizer and filter relays were reprogrammed
    FrequencyApplied {
        frequency_hz: u32,
        mode: OperatingMode,
        clocks: ClockPlan,
        band: FilterBand,
    },
    /// Transmit started or ended
    TransmitChanged {
        transmitting: bool,
        trigger: PttTrigger,
    },
    /// CW key line closed (`true`) or opened
    KeyChanged(bool),
    /// Side-tone oscillator switched
    SidetoneChanged(bool),
    /// Keyer started sending an element
    ElementSent(Element),
    /// Active VFO changed
    VfoChanged(Vfo),
    SplitChanged(bool),
    RitChanged(bool),
    KeyerModeChanged(KeyerMode),
}
