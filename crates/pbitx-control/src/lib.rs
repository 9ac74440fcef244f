//! pBitx Transceiver Control Core
//!
//! The decision-making layer of the transceiver, independent of any board:
//!
//! - **Synthesizer planning**: Si5351 divider parameters for the three
//!   oscillators, and which frequency each one needs
//! - **VFO manager**: two channels plus the live view, split and RIT
//! - **TX/RX sequencer**: hardware and CI-V transmit triggers with latching
//! - **CW keyer**: straight, semi-automatic and iambic element timing
//! - **CI-V dispatcher**: a fixed command table answering controllers
//!
//! Hardware is reached only through the traits in [`hal`] and settings
//! through [`PersistentStore`], so the same [`Rig`] runs on the radio, in the
//! simulator and in tests.
//!
//! # Example
//!
//! ```rust
//! use pbitx_control::{PttTrigger, RadioState};
//!
//! let mut state = RadioState::default();
//! assert!(state.enter_transmit(PttTrigger::Hardware));
//! // A CI-V "transmit off" cannot end a PTT transmission
//! assert!(!state.leave_transmit(PttTrigger::Soft));
//! assert!(state.in_transmit());
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod hal;
pub mod keyer;
pub mod radio;
pub mod sequencer;
pub mod state;
pub mod store;
pub mod synth;
pub mod vfo;

pub use config::RadioConfig;
pub use dispatch::{Response, RigControl};
pub use error::{ControlError, DispatchError};
pub use events::RigEvent;
pub use hal::{
    AnalogChannel, AnalogInput, BusTransport, Clock, DigitalInput, InputLine, OutputLine,
    OutputLines, RigHardware,
};
pub use keyer::{Element, Keyer, KeyerConfig, KeyerMode, KeyerOutput, PaddleState};
pub use radio::{Rig, MAX_PENDING_EVENTS};
pub use sequencer::{FilterBand, PttTrigger};
pub use state::{RadioState, VfoChannel};
pub use store::{MemoryStore, PersistentStore};
pub use synth::{ClockPlan, OutputClock, Synthesizer, SynthesizerPlan};
