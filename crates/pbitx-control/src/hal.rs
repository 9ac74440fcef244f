//! Hardware seams
//!
//! The control core never talks to peripherals directly. Everything it needs
//! from the board goes through these traits so the same logic runs on the
//! radio and in the simulator.

/// Writes synthesizer registers
pub trait BusTransport {
    /// Write `bytes` to consecutive registers starting at `start`
    fn write_registers(&mut self, start: u8, bytes: &[u8]);
}

/// Analog inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogChannel {
    /// Resistor-ladder paddle / straight key line
    Paddle,
}

/// Reads raw 12-bit ADC samples
pub trait AnalogInput {
    fn sample_analog(&mut self, channel: AnalogChannel) -> u16;
}

/// Digital inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLine {
    /// Microphone PTT, active low
    Ptt,
}

/// Reads digital input levels
pub trait DigitalInput {
    /// `true` when the line is high
    fn read_digital(&mut self, line: InputLine) -> bool;
}

/// Digital outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputLine {
    /// Transmit/receive relay
    TxRx,
    /// CW key line
    CwKey,
    /// Low-pass filter relay A
    LpfA,
    /// Low-pass filter relay B
    LpfB,
    /// Low-pass filter relay C
    LpfC,
    /// Side-tone oscillator enable
    Sidetone,
}

/// Drives digital outputs
pub trait OutputLines {
    fn set_output(&mut self, line: OutputLine, high: bool);
}

/// Monotonic millisecond clock
pub trait Clock {
    fn now_ticks(&self) -> u32;
}

/// Everything the rig needs from the board
pub trait RigHardware: BusTransport + AnalogInput + DigitalInput + OutputLines + Clock {}

impl<T> RigHardware for T where T: BusTransport + AnalogInput + DigitalInput + OutputLines + Clock {}
