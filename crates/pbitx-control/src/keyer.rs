//! CW keyer
//!
//! Paddles and straight keys share one resistor-ladder ADC line. Each tick
//! the line is sampled eight times and majority-voted into a paddle state.
//!
//! Semi-automatic and iambic modes run an element state machine: every
//! element is followed by a one-dot space, and a break-in hang timer keeps
//! the rig in transmit between elements. Straight mode follows the contact
//! directly and only shares the hang timer.
//!
//! The keyer never drives outputs itself. [`Keyer::tick`] returns a
//! [`KeyerOutput`] that the rig applies through the sequencer.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::hal::{AnalogChannel, AnalogInput};

/// ADC samples taken per decision
pub const NUM_SAMPLES: usize = 8;

/// Samples (ADC >> 4) at or above this level are an open line
const OPEN_LEVEL: u16 = 0xE0;
/// Below this: both paddles
const BOTH_LEVEL: u16 = 0x60;
/// Below this: dot paddle
const DOT_LEVEL: u16 = 0x70;
/// Below this: dash paddle, or a closed straight key
const DASH_LEVEL: u16 = 0xD8;

/// A paddle state needs more than this many of the eight samples
const PADDLE_VOTES: u8 = 4;
/// A straight key is closed with more than this many samples
const STRAIGHT_VOTES: u8 = 5;

/// Break-in hang time for a straight key
pub const STRAIGHT_BREAK_IN_TICKS: u16 = 40;
/// Dot lengths of hang time after an element
const BREAK_IN_DOTS: u16 = 5;
/// Dot lengths of settling time before the first element
const STARTUP_DOTS: u16 = 5;
/// Speed setting divides this to get the dot length in ticks
const DOT_SCALE: u16 = 500;

/// How the key input is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyerMode {
    /// Single contact, keyed directly
    #[default]
    Straight,
    /// Paddles select repeating dots or dashes, no squeeze alternation
    SemiAutomatic,
    /// Squeezing both paddles alternates dots and dashes
    Iambic,
}

impl KeyerMode {
    /// Value kept in the settings store
    pub fn stored(self) -> u32 {
        match self {
            KeyerMode::Straight => 0,
            KeyerMode::SemiAutomatic => 1,
            KeyerMode::Iambic => 2,
        }
    }

    pub fn from_stored(value: u32) -> Option<Self> {
        match value {
            0 => Some(KeyerMode::Straight),
            1 => Some(KeyerMode::SemiAutomatic),
            2 => Some(KeyerMode::Iambic),
            _ => None,
        }
    }
}

/// Debounced paddle input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddleState {
    #[default]
    None,
    Dash,
    Dot,
    Both,
}

/// A Morse element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Dot,
    Dash,
}

/// Timing derived from the speed setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyerConfig {
    pub mode: KeyerMode,
    /// Dot length, always at least one tick
    pub dit_length_ticks: u16,
    /// Hang time before dropping out of transmit
    pub break_in_delay_ticks: u16,
}

impl KeyerConfig {
    pub fn from_speed(speed: u16, mode: KeyerMode) -> Self {
        let dit_length_ticks = (DOT_SCALE / speed.max(1)).max(1);
        let break_in_delay_ticks = match mode {
            KeyerMode::Straight => STRAIGHT_BREAK_IN_TICKS,
            KeyerMode::SemiAutomatic | KeyerMode::Iambic => {
                BREAK_IN_DOTS.saturating_mul(dit_length_ticks)
            }
        };
        Self {
            mode,
            dit_length_ticks,
            break_in_delay_ticks,
        }
    }
}

/// Majority-vote debouncer for the paddle line
#[derive(Debug, Clone, Default)]
pub struct PaddleSampler {
    last: PaddleState,
    changed: bool,
}

impl PaddleSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take [`NUM_SAMPLES`] readings and vote
    pub fn sample<A>(&mut self, input: &mut A) -> PaddleState
    where
        A: AnalogInput + ?Sized,
    {
        let mut samples = [0u16; NUM_SAMPLES];
        for s in samples.iter_mut() {
            *s = input.sample_analog(AnalogChannel::Paddle);
        }
        self.record(&samples)
    }

    /// Vote on raw 12-bit samples
    pub fn record(&mut self, samples: &[u16]) -> PaddleState {
        let state = classify(samples);
        self.changed = state != self.last;
        self.last = state;
        state
    }

    /// Whether the last vote differed from the one before
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn last(&self) -> PaddleState {
        self.last
    }
}

/// Bin each sample and pick Both, Dot, Dash in that order of precedence
pub fn classify(samples: &[u16]) -> PaddleState {
    let (mut both, mut dot, mut dash) = (0u8, 0u8, 0u8);
    for &raw in samples {
        let level = raw >> 4;
        if level >= OPEN_LEVEL {
            continue;
        }
        if level < BOTH_LEVEL {
            both += 1;
        } else if level < DOT_LEVEL {
            dot += 1;
        } else if level < DASH_LEVEL {
            dash += 1;
        }
    }

    if both > PADDLE_VOTES {
        PaddleState::Both
    } else if dot > PADDLE_VOTES {
        PaddleState::Dot
    } else if dash > PADDLE_VOTES {
        PaddleState::Dash
    } else {
        PaddleState::None
    }
}

/// Countdowns and flags mutated every tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyerRuntime {
    pub paddle_sample: PaddleState,
    /// Ticks left in the current element or space
    pub element_countdown: u16,
    pub in_inter_element_space: bool,
    /// Ticks left before dropping out of transmit
    pub hang_countdown: u16,
    /// Element chosen for the next slot
    pub pending: Option<Element>,
    /// Element most recently keyed
    pub last_element: Option<Element>,
    pub key_closed: bool,
    pub sidetone_on: bool,
}

/// What the sequencer should do with transmit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitRequest {
    Enter,
    Leave,
}

/// Changes produced by one keyer tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyerOutput {
    pub transmit: Option<TransmitRequest>,
    /// New key line state, when it changed
    pub key: Option<bool>,
    /// New side-tone state, when it changed
    pub sidetone: Option<bool>,
    /// Element started this tick
    pub element: Option<Element>,
}

/// CW keyer state machine
#[derive(Debug, Clone)]
pub struct Keyer {
    config: KeyerConfig,
    speed: u16,
    runtime: KeyerRuntime,
    sampler: PaddleSampler,
}

impl Keyer {
    pub fn new(speed: u16, mode: KeyerMode) -> Self {
        let config = KeyerConfig::from_speed(speed, mode);
        let runtime = KeyerRuntime {
            element_countdown: STARTUP_DOTS.saturating_mul(config.dit_length_ticks),
            ..KeyerRuntime::default()
        };
        Self {
            config,
            speed,
            runtime,
            sampler: PaddleSampler::new(),
        }
    }

    pub fn config(&self) -> KeyerConfig {
        self.config
    }

    pub fn mode(&self) -> KeyerMode {
        self.config.mode
    }

    pub fn speed(&self) -> u16 {
        self.speed
    }

    pub fn runtime(&self) -> &KeyerRuntime {
        &self.runtime
    }

    pub fn sampler(&self) -> &PaddleSampler {
        &self.sampler
    }

    pub fn set_speed(&mut self, speed: u16) {
        self.speed = speed;
        self.config = KeyerConfig::from_speed(speed, self.config.mode);
    }

    pub fn set_mode(&mut self, mode: KeyerMode) {
        self.config = KeyerConfig::from_speed(self.speed, mode);
    }

    /// Restart the element machine and pick the mode from the held paddle
    ///
    /// Nothing held selects a straight key, a held dot paddle selects
    /// semi-automatic and a held dash paddle selects iambic. Both held
    /// keeps the current mode.
    pub fn start<A>(&mut self, input: &mut A) -> KeyerMode
    where
        A: AnalogInput + ?Sized,
    {
        let mode = match self.sampler.sample(input) {
            PaddleState::None => KeyerMode::Straight,
            PaddleState::Dot => KeyerMode::SemiAutomatic,
            PaddleState::Dash => KeyerMode::Iambic,
            PaddleState::Both => self.config.mode,
        };
        self.set_mode(mode);
        self.runtime = KeyerRuntime {
            element_countdown: STARTUP_DOTS.saturating_mul(self.config.dit_length_ticks),
            ..KeyerRuntime::default()
        };
        debug!(?mode, dit = self.config.dit_length_ticks, "Keyer started");
        mode
    }

    /// Advance one tick
    pub fn tick<A>(&mut self, input: &mut A, in_transmit: bool) -> KeyerOutput
    where
        A: AnalogInput + ?Sized,
    {
        let mut out = KeyerOutput::default();
        match self.config.mode {
            KeyerMode::Straight => self.tick_straight(input, in_transmit, &mut out),
            KeyerMode::SemiAutomatic | KeyerMode::Iambic => {
                self.tick_paddles(input, in_transmit, &mut out)
            }
        }
        out
    }

    fn tick_paddles<A>(&mut self, input: &mut A, in_transmit: bool, out: &mut KeyerOutput)
    where
        A: AnalogInput + ?Sized,
    {
        if self.runtime.element_countdown != 0 {
            self.runtime.element_countdown -= 1;
        }

        self.run_hang_timer(in_transmit, out);

        if self.runtime.element_countdown != 0 {
            return;
        }

        if self.runtime.in_inter_element_space {
            self.runtime.element_countdown = self.config.dit_length_ticks;
            self.set_key(false, out);
            self.runtime.hang_countdown = self.config.break_in_delay_ticks;
            self.runtime.in_inter_element_space = false;
        } else {
            self.choose_element(input);
        }

        self.send_pending(out);
    }

    fn choose_element<A>(&mut self, input: &mut A)
    where
        A: AnalogInput + ?Sized,
    {
        let paddle = self.sampler.sample(input);
        self.runtime.paddle_sample = paddle;

        let pending = &mut self.runtime.pending;
        match paddle {
            PaddleState::None => *pending = None,
            PaddleState::Dash => *pending = Some(Element::Dash),
            PaddleState::Dot => *pending = Some(Element::Dot),
            PaddleState::Both if self.config.mode == KeyerMode::Iambic => {
                *pending = match *pending {
                    Some(Element::Dash) => Some(Element::Dot),
                    Some(Element::Dot) => Some(Element::Dash),
                    None => Some(Element::Dash),
                };
            }
            PaddleState::Both => {}
        }
    }

    fn send_pending(&mut self, out: &mut KeyerOutput) {
        if self.runtime.element_countdown != 0 || self.runtime.in_inter_element_space {
            return;
        }
        let Some(element) = self.runtime.pending else {
            return;
        };

        let dots = match element {
            Element::Dot => 1,
            Element::Dash => 3,
        };
        self.runtime.element_countdown = self.config.dit_length_ticks.saturating_mul(dots);
        self.set_key(true, out);
        self.runtime.in_inter_element_space = true;
        self.runtime.hang_countdown = self.config.break_in_delay_ticks;
        self.runtime.last_element = Some(element);
        out.element = Some(element);
        trace!(?element, "Element");
    }

    fn tick_straight<A>(&mut self, input: &mut A, in_transmit: bool, out: &mut KeyerOutput)
    where
        A: AnalogInput + ?Sized,
    {
        self.run_hang_timer(in_transmit, out);

        let closed = (0..NUM_SAMPLES)
            .filter(|_| (input.sample_analog(AnalogChannel::Paddle) >> 4) < DASH_LEVEL)
            .count() as u8;

        if closed > STRAIGHT_VOTES {
            self.runtime.hang_countdown = self.config.break_in_delay_ticks;
            self.set_key(true, out);
        } else if closed == 0 {
            self.set_key(false, out);
        }
    }

    /// Hold transmit while the hang timer runs
    fn run_hang_timer(&mut self, in_transmit: bool, out: &mut KeyerOutput) {
        let hang = &mut self.runtime.hang_countdown;
        if *hang != 0 && !in_transmit {
            out.transmit = Some(TransmitRequest::Enter);
        } else if *hang == 0 && in_transmit {
            out.transmit = Some(TransmitRequest::Leave);
        } else if *hang != 0 {
            *hang -= 1;
        }
    }

    /// Key line and side-tone move together
    fn set_key(&mut self, closed: bool, out: &mut KeyerOutput) {
        if self.runtime.key_closed != closed {
            self.runtime.key_closed = closed;
            out.key = Some(closed);
        }
        if self.runtime.sidetone_on != closed {
            self.runtime.sidetone_on = closed;
            out.sidetone = Some(closed);
        }
    }
}
