//! Si5351 synthesizer planning
//!
//! The VCO runs at a fixed frequency (25 MHz crystal x 35) and each of the
//! three outputs divides it down with a fractional multisynth:
//!
//! ```text
//! FOUT = FVCO / (a + b/c)
//! P1 = 128a + floor(128b/c) - 512
//! P2 = 128b - c * floor(128b/c)
//! P3 = c
//! ```
//!
//! Crystal error is corrected by adjusting the VCO figure used in the
//! arithmetic, not the VCO itself.

use pbitx_protocol::OperatingMode;
use tracing::trace;

use crate::config::RadioConfig;
use crate::hal::BusTransport;

/// Lowest output frequency the planner will enable
pub const MIN_OUTPUT_HZ: u32 = 500_000;
/// Highest output frequency the planner will enable
pub const MAX_OUTPUT_HZ: u32 = 109_000_000;

/// Factory calibration offset applied to the VCO figure
pub const DEFAULT_CALIBRATION: i32 = 11_850;

/// Multisynth integer divider limits; outside them P1 would not fit its field
const MIN_INTEGER_DIVIDER: u32 = 4;
const MAX_INTEGER_DIVIDER: u32 = 2048;

/// Largest multisynth denominator (20 bits)
const MAX_DENOMINATOR_MASK: u32 = 0xFFF0_0000;

/// Output enable register; a set bit disables the clock
const REG_OUTPUT_ENABLE: u8 = 3;
/// First clock control register (CLK0)
const REG_CLOCK_CONTROL: u8 = 16;
/// First multisynth parameter block (MS0)
const REG_MULTISYNTH: u8 = 42;
/// Clock control: integer mode off, source multisynth, powered
const CLOCK_CONTROL_BASE: u8 = 0x0C;

/// Whether the synthesizer can produce `hz`
#[must_use]
pub fn is_supported(hz: u32) -> bool {
    (MIN_OUTPUT_HZ..=MAX_OUTPUT_HZ).contains(&hz)
}

/// Multisynth parameters for one output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthesizerPlan {
    /// P1, with the R divider exponent in bits 20..23
    pub integer_divider: u32,
    /// P2
    pub frac_numerator: u32,
    /// P3
    pub frac_denominator: u32,
    /// R divider exponent (output sees FOUT / 2^r)
    pub right_divider: u8,
    /// `false` when the target was out of range
    pub output_enabled: bool,
}

impl SynthesizerPlan {
    /// Plan for an output that stays off
    pub const DISABLED: Self = Self {
        integer_divider: 0,
        frac_numerator: 0,
        frac_denominator: 0,
        right_divider: 0,
        output_enabled: false,
    };

    /// Eight multisynth register bytes in Si5351 order
    #[must_use]
    pub fn register_bytes(&self) -> [u8; 8] {
        let p1 = self.integer_divider;
        let p2 = self.frac_numerator;
        let p3 = self.frac_denominator;
        let p3p2_top = ((p3 & 0x000F_0000) << 4) | p2;
        [
            (p3 >> 8) as u8,
            p3 as u8,
            (p1 >> 16) as u8,
            (p1 >> 8) as u8,
            p1 as u8,
            (p3p2_top >> 16) as u8,
            (p2 >> 8) as u8,
            p2 as u8,
        ]
    }

    /// Reconstruct `a + b/c` from the register fields
    #[must_use]
    pub fn divider_ratio(&self) -> f64 {
        if !self.output_enabled || self.frac_denominator == 0 {
            return 0.0;
        }
        let p1 = f64::from(self.integer_divider & 0x000F_FFFF);
        let p2 = f64::from(self.frac_numerator);
        let p3 = f64::from(self.frac_denominator);
        (p1 + 512.0 + p2 / p3) / 128.0
    }
}

/// Compute multisynth parameters for `target_hz`
///
/// Targets outside [`MIN_OUTPUT_HZ`]..=[`MAX_OUTPUT_HZ`] produce a disabled
/// plan; other outputs are unaffected. So do targets the VCO cannot reach
/// with a divider between 4 and 2048.
#[must_use]
pub fn plan(target_hz: u32, vco_hz: u32, right_divider: u8) -> SynthesizerPlan {
    if !is_supported(target_hz) {
        return SynthesizerPlan::DISABLED;
    }

    let a = vco_hz / target_hz;
    if !(MIN_INTEGER_DIVIDER..MAX_INTEGER_DIVIDER).contains(&a) {
        return SynthesizerPlan::DISABLED;
    }
    let mut b = vco_hz % target_hz;
    let mut c = target_hz;

    // Halve the fraction until the denominator fits 20 bits
    while c & MAX_DENOMINATOR_MASK != 0 {
        b >>= 1;
        c >>= 1;
    }

    let frac = 128 * b / c;
    let integer_divider = (128 * a + frac - 512) | (u32::from(right_divider & 0x07) << 20);
    let frac_numerator = 128 * b - frac * c;

    SynthesizerPlan {
        integer_divider,
        frac_numerator,
        frac_denominator: c,
        right_divider: right_divider & 0x07,
        output_enabled: true,
    }
}

/// The three synthesizer outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputClock {
    /// CLK0: carrier oscillator for the detector/modulator
    Carrier = 0,
    /// CLK1: second local oscillator
    SecondLo = 1,
    /// CLK2: first local oscillator (the VFO)
    FirstLo = 2,
}

impl OutputClock {
    pub const ALL: [OutputClock; 3] = [
        OutputClock::FirstLo,
        OutputClock::SecondLo,
        OutputClock::Carrier,
    ];

    fn index(self) -> u8 {
        self as u8
    }
}

/// Frequencies for all three outputs; zero turns an output off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockPlan {
    pub carrier_hz: u32,
    pub second_lo_hz: u32,
    pub first_lo_hz: u32,
}

impl ClockPlan {
    /// Oscillator frequencies for operating on `hz`
    ///
    /// The carrier stays fixed on the upper-sideband side of the crystal
    /// filter. Sideband selection comes from placing the second oscillator
    /// above or below the first IF. CW transmit drives the first oscillator
    /// directly at the signal frequency plus the side-tone offset.
    #[must_use]
    pub fn for_frequency(
        hz: u32,
        mode: OperatingMode,
        in_transmit: bool,
        first_if_hz: u32,
        carrier_hz: u32,
        sidetone_hz: u32,
    ) -> Self {
        match mode {
            OperatingMode::Cw if in_transmit => Self {
                carrier_hz: 0,
                second_lo_hz: 0,
                first_lo_hz: hz.saturating_add(sidetone_hz),
            },
            OperatingMode::Lsb => Self {
                carrier_hz,
                second_lo_hz: first_if_hz.saturating_sub(carrier_hz),
                first_lo_hz: first_if_hz.saturating_add(hz),
            },
            OperatingMode::Usb | OperatingMode::Cw => Self {
                carrier_hz,
                second_lo_hz: first_if_hz.saturating_add(carrier_hz),
                first_lo_hz: first_if_hz.saturating_add(hz),
            },
        }
    }

    pub fn frequency(&self, clock: OutputClock) -> u32 {
        match clock {
            OutputClock::Carrier => self.carrier_hz,
            OutputClock::SecondLo => self.second_lo_hz,
            OutputClock::FirstLo => self.first_lo_hz,
        }
    }
}

/// Si5351 output driver state
#[derive(Debug, Clone)]
pub struct Synthesizer {
    nominal_vco_hz: u32,
    calibration: i32,
    drive: [u8; 3],
    right_divider: u8,
    enable_mask: u8,
}

impl Synthesizer {
    /// All outputs start disabled
    pub fn new(config: &RadioConfig, calibration: i32) -> Self {
        Self {
            nominal_vco_hz: config.nominal_vco_hz(),
            calibration,
            drive: config.clock_drive,
            right_divider: 0,
            enable_mask: 0xFF,
        }
    }

    /// VCO figure used for divider arithmetic
    pub fn vco_hz(&self) -> u32 {
        self.nominal_vco_hz.saturating_add_signed(self.calibration)
    }

    pub fn calibration(&self) -> i32 {
        self.calibration
    }

    pub fn set_calibration(&mut self, calibration: i32) {
        self.calibration = calibration;
    }

    /// Output enable register value (bit set = output off)
    pub fn enable_mask(&self) -> u8 {
        self.enable_mask
    }

    pub fn is_enabled(&self, clock: OutputClock) -> bool {
        self.enable_mask & (1 << clock.index()) == 0
    }

    /// Plan `hz` for `clock` and write it to the chip
    pub fn set_output<B>(&mut self, bus: &mut B, clock: OutputClock, hz: u32) -> SynthesizerPlan
    where
        B: BusTransport + ?Sized,
    {
        let index = clock.index();
        let plan = plan(hz, self.vco_hz(), self.right_divider);

        if plan.output_enabled {
            bus.write_registers(REG_MULTISYNTH + index * 8, &plan.register_bytes());
            bus.write_registers(
                REG_CLOCK_CONTROL + index,
                &[CLOCK_CONTROL_BASE | (self.drive[usize::from(index)] & 0x03)],
            );
            self.enable_mask &= !(1 << index);
        } else {
            self.enable_mask |= 1 << index;
        }
        bus.write_registers(REG_OUTPUT_ENABLE, &[self.enable_mask]);

        trace!(?clock, hz, enabled = plan.output_enabled, "synthesizer output");
        plan
    }

    /// Write every output of `clocks`
    pub fn apply<B>(&mut self, bus: &mut B, clocks: &ClockPlan)
    where
        B: BusTransport + ?Sized,
    {
        for clock in OutputClock::ALL {
            self.set_output(bus, clock, clocks.frequency(clock));
        }
    }
}
