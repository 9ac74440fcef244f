//! Simulated board
//!
//! Captures synthesizer register writes into a register image, holds the
//! paddle and PTT levels the rig reads, remembers every output line and
//! keeps a manually advanced millisecond clock.

use std::collections::HashMap;

use pbitx_control::{
    AnalogChannel, AnalogInput, BusTransport, Clock, DigitalInput, InputLine, OutputClock,
    OutputLine, OutputLines,
};

/// ADC level of an idle paddle line
pub const PADDLE_OPEN_LEVEL: u16 = 0xFFF;
/// ADC level with the dot paddle closed
pub const PADDLE_DOT_LEVEL: u16 = 0x680;
/// ADC level with the dash paddle closed
pub const PADDLE_DASH_LEVEL: u16 = 0x900;
/// ADC level with both paddles closed
pub const PADDLE_BOTH_LEVEL: u16 = 0x300;

/// Si5351 output enable register
const REG_OUTPUT_ENABLE: u8 = 3;

/// Virtual pBitx board
#[derive(Debug, Clone)]
pub struct VirtualBoard {
    registers: [u8; 256],
    register_writes: usize,
    paddle_level: u16,
    ptt_pressed: bool,
    outputs: HashMap<OutputLine, bool>,
    now_ms: u32,
}

impl VirtualBoard {
    /// Idle paddle, PTT released, all outputs off
    pub fn new() -> Self {
        let mut registers = [0u8; 256];
        registers[usize::from(REG_OUTPUT_ENABLE)] = 0xFF;
        Self {
            registers,
            register_writes: 0,
            paddle_level: PADDLE_OPEN_LEVEL,
            ptt_pressed: false,
            outputs: HashMap::new(),
            now_ms: 0,
        }
    }

    pub fn paddle_level(&self) -> u16 {
        self.paddle_level
    }

    /// Set the raw 12-bit level on the paddle line
    pub fn set_paddle_level(&mut self, level: u16) {
        self.paddle_level = level & 0x0FFF;
    }

    pub fn ptt_pressed(&self) -> bool {
        self.ptt_pressed
    }

    pub fn set_ptt(&mut self, pressed: bool) {
        self.ptt_pressed = pressed;
    }

    /// Last level written to `line`; untouched lines read low
    pub fn output(&self, line: OutputLine) -> bool {
        self.outputs.get(&line).copied().unwrap_or(false)
    }

    pub fn register(&self, address: u8) -> u8 {
        self.registers[usize::from(address)]
    }

    /// Number of register write bursts seen
    pub fn register_writes(&self) -> usize {
        self.register_writes
    }

    /// Whether the chip currently drives `clock`
    pub fn clock_enabled(&self, clock: OutputClock) -> bool {
        self.register(REG_OUTPUT_ENABLE) & (1 << clock as u8) == 0
    }

    /// The eight multisynth parameter registers of `clock`
    pub fn multisynth(&self, clock: OutputClock) -> [u8; 8] {
        let start = 42 + usize::from(clock as u8) * 8;
        let mut out = [0u8; 8];
        out.copy_from_slice(&self.registers[start..start + 8]);
        out
    }

    pub fn now_ms(&self) -> u32 {
        self.now_ms
    }

    /// Move the clock forward
    pub fn advance(&mut self, ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(ms);
    }
}

impl Default for VirtualBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl BusTransport for VirtualBoard {
    fn write_registers(&mut self, start: u8, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            let address = usize::from(start) + offset;
            if let Some(slot) = self.registers.get_mut(address) {
                *slot = *byte;
            }
        }
        self.register_writes += 1;
    }
}

impl AnalogInput for VirtualBoard {
    fn sample_analog(&mut self, channel: AnalogChannel) -> u16 {
        match channel {
            AnalogChannel::Paddle => self.paddle_level,
        }
    }
}

impl DigitalInput for VirtualBoard {
    fn read_digital(&mut self, line: InputLine) -> bool {
        match line {
            // Active low
            InputLine::Ptt => !self.ptt_pressed,
        }
    }
}

impl OutputLines for VirtualBoard {
    fn set_output(&mut self, line: OutputLine, high: bool) {
        self.outputs.insert(line, high);
    }
}

impl Clock for VirtualBoard {
    fn now_ticks(&self) -> u32 {
        self.now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbitx_control::{RadioConfig, Synthesizer};

    #[test]
    fn test_new_board_is_idle() {
        let mut board = VirtualBoard::new();
        assert!(board.read_digital(InputLine::Ptt));
        assert_eq!(board.sample_analog(AnalogChannel::Paddle), PADDLE_OPEN_LEVEL);
        assert!(!board.output(OutputLine::TxRx));
        for clock in OutputClock::ALL {
            assert!(!board.clock_enabled(clock));
        }
    }

    #[test]
    fn test_ptt_is_active_low() {
        let mut board = VirtualBoard::new();
        board.set_ptt(true);
        assert!(!board.read_digital(InputLine::Ptt));
    }

    #[test]
    fn test_captures_synthesizer_writes() {
        let mut board = VirtualBoard::new();
        let mut synth = Synthesizer::new(&RadioConfig::default(), 0);
        let plan = synth.set_output(&mut board, OutputClock::FirstLo, 52_155_000);

        assert!(board.clock_enabled(OutputClock::FirstLo));
        assert!(!board.clock_enabled(OutputClock::Carrier));
        assert_eq!(board.multisynth(OutputClock::FirstLo), plan.register_bytes());
        assert_eq!(board.register(18), 0x0F);
    }

    #[test]
    fn test_write_past_register_space_is_dropped() {
        let mut board = VirtualBoard::new();
        board.write_registers(254, &[1, 2, 3, 4]);
        assert_eq!(board.register(254), 1);
        assert_eq!(board.register(255), 2);
        assert_eq!(board.register_writes(), 1);
    }

    #[test]
    fn test_clock_wraps() {
        let mut board = VirtualBoard::new();
        board.advance(u32::MAX);
        board.advance(2);
        assert_eq!(board.now_ticks(), 1);
    }
}
