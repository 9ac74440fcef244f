//! The rig
//!
//! [`Rig`] owns the radio state, the keyer, the synthesizer driver, the
//! board and the settings store. It is the only thing that touches the
//! hardware: the state machines return decisions and the rig carries them
//! out, then records a [`RigEvent`].

use std::collections::VecDeque;

use pbitx_protocol::{CivFrame, OperatingMode, Vfo, BROADCAST_ADDRESS};
use tracing::{debug, info};

use crate::config::RadioConfig;
use crate::dispatch::{dispatch, RigControl};
use crate::error::ControlError;
use crate::events::RigEvent;
use crate::hal::{InputLine, OutputLine, RigHardware};
use crate::keyer::{Keyer, KeyerMode, KeyerOutput, TransmitRequest};
use crate::sequencer::{FilterBand, PttTrigger};
use crate::state::RadioState;
use crate::store::{keys, PersistentStore, ERASED};
use crate::synth::{ClockPlan, Synthesizer, DEFAULT_CALIBRATION};

/// Accepted carrier oscillator settings
pub const CARRIER_RANGE_HZ: std::ops::RangeInclusive<u32> = 11_048_000..=11_060_000;
pub const DEFAULT_CARRIER_HZ: u32 = 11_052_000;
/// Accepted side-tone pitches
pub const SIDETONE_RANGE_HZ: std::ops::RangeInclusive<u32> = 100..=2000;
pub const DEFAULT_SIDETONE_HZ: u32 = 800;
/// Accepted CW speed settings
pub const CW_SPEED_RANGE: std::ops::RangeInclusive<u32> = 10..=1000;
pub const DEFAULT_CW_SPEED: u16 = 100;

/// Band start frequencies for band switching
pub const BAND_BASES_HZ: [u32; 8] = [
    3_500_000, 7_000_000, 10_000_000, 14_000_000, 18_000_000, 21_000_000, 24_800_000, 28_000_000,
];

/// Sideband flips when tuning across this frequency
const SIDEBAND_CROSSOVER_HZ: u32 = 10_000_000;
/// Tuning step while RIT is on
const RIT_STEP_HZ: i64 = 100;
/// PTT line is ignored this long after keying up
const PTT_DEBOUNCE_MS: u32 = 50;
/// Undrained events kept; older ones are discarded first
pub const MAX_PENDING_EVENTS: usize = 1024;

/// Transceiver control core bound to a board and a settings store
pub struct Rig<H, S> {
    config: RadioConfig,
    state: RadioState,
    keyer: Keyer,
    synth: Synthesizer,
    hardware: H,
    store: S,
    carrier_hz: u32,
    sidetone_hz: u32,
    ptt_keyed_at: Option<u32>,
    events: VecDeque<RigEvent>,
}

impl<H, S> Rig<H, S>
where
    H: RigHardware,
    S: PersistentStore,
{
    /// Restore settings from `store`, put the board in receive and tune
    ///
    /// Every stored value outside its valid range falls back to its
    /// default.
    pub fn boot(config: RadioConfig, hardware: H, store: S) -> Self {
        let state = RadioState::restore(&store);

        let carrier_hz = stored_or(&store, keys::USB_CAL, CARRIER_RANGE_HZ, DEFAULT_CARRIER_HZ);
        let sidetone_hz =
            stored_or(&store, keys::CW_SIDETONE, SIDETONE_RANGE_HZ, DEFAULT_SIDETONE_HZ);
        let cw_speed = stored_or(&store, keys::CW_SPEED, CW_SPEED_RANGE, u32::from(DEFAULT_CW_SPEED));
        let calibration = match store.get(keys::MASTER_CAL) {
            ERASED => DEFAULT_CALIBRATION,
            // Signed values are stored by bit pattern
            value => value as i32,
        };
        let keyer_mode = KeyerMode::from_stored(store.get(keys::CW_KEY_TYPE)).unwrap_or_default();

        let synth = Synthesizer::new(&config, calibration);
        let keyer = Keyer::new(u16::try_from(cw_speed).unwrap_or(DEFAULT_CW_SPEED), keyer_mode);

        let mut rig = Self {
            config,
            state,
            keyer,
            synth,
            hardware,
            store,
            carrier_hz,
            sidetone_hz,
            ptt_keyed_at: None,
            events: VecDeque::new(),
        };

        for line in [OutputLine::TxRx, OutputLine::CwKey, OutputLine::Sidetone] {
            rig.hardware.set_output(line, false);
        }
        rig.apply_frequency();

        info!(
            "Rig booted on {} at {} Hz {}, carrier {} Hz, calibration {}, keyer {:?}",
            rig.state.active_vfo(),
            rig.state.frequency_hz(),
            rig.state.mode(),
            carrier_hz,
            calibration,
            keyer_mode
        );
        rig
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn state(&self) -> &RadioState {
        &self.state
    }

    pub fn keyer(&self) -> &Keyer {
        &self.keyer
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synth
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn carrier_hz(&self) -> u32 {
        self.carrier_hz
    }

    pub fn sidetone_hz(&self) -> u32 {
        self.sidetone_hz
    }

    /// Take the events recorded since the last call
    ///
    /// Callers should drain regularly; only the newest
    /// [`MAX_PENDING_EVENTS`] are kept.
    pub fn drain_events(&mut self) -> Vec<RigEvent> {
        self.events.drain(..).collect()
    }

    fn record(&mut self, event: RigEvent) {
        if self.events.len() == MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Program the synthesizer and filter relays for the live frequency
    pub fn apply_frequency(&mut self) {
        let live = self.state.live();
        let clocks = ClockPlan::for_frequency(
            live.frequency_hz,
            live.mode,
            self.state.in_transmit(),
            self.config.first_if_hz,
            self.carrier_hz,
            self.sidetone_hz,
        );
        self.synth.apply(&mut self.hardware, &clocks);

        let band = FilterBand::for_frequency(live.frequency_hz);
        for (line, high) in band.relays() {
            self.hardware.set_output(line, high);
        }

        debug!(hz = live.frequency_hz, mode = %live.mode, ?band, "Frequency applied");
        self.record(RigEvent::FrequencyApplied {
            frequency_hz: live.frequency_hz,
            mode: live.mode,
            clocks,
            band,
        });
    }

    /// Run one polling-loop iteration
    ///
    /// In CW the keyer runs; otherwise the PTT line is polled.
    pub fn tick(&mut self) {
        if self.state.mode() == OperatingMode::Cw {
            let out = self.keyer.tick(&mut self.hardware, self.state.in_transmit());
            self.apply_keyer_output(out);
        } else {
            self.poll_ptt();
        }
    }

    /// Dispatch one CI-V frame and return the bytes to send back
    ///
    /// Frames for other addresses are ignored.
    pub fn handle_frame(&mut self, frame: &CivFrame) -> Vec<u8> {
        if frame.dest != self.config.rig_address && frame.dest != BROADCAST_ADDRESS {
            debug!("Ignoring CI-V frame for 0x{:02X}", frame.dest);
            return Vec::new();
        }
        dispatch(self, frame).encode()
    }

    /// Tune by `steps` encoder detents
    ///
    /// Faster turning takes bigger steps. Crossing 10 MHz selects the
    /// conventional sideband. With RIT on the receive frequency moves in
    /// 100 Hz steps. Ignored while transmitting.
    pub fn tune(&mut self, steps: i32) {
        if steps == 0 || self.state.in_transmit() {
            return;
        }

        let rate = steps.unsigned_abs();
        let step_hz = if self.state.rit_enabled() {
            RIT_STEP_HZ
        } else if rate > 10 {
            200
        } else if rate > 5 {
            100
        } else {
            50
        };

        let previous = self.state.frequency_hz();
        let Ok(target) = u32::try_from(i64::from(previous) + i64::from(steps) * step_hz) else {
            debug!(steps, "Tuning below zero ignored");
            return;
        };
        if let Err(e) = self.state.set_live_frequency(target) {
            debug!("Tuning ignored: {}", e);
            return;
        }

        if !self.state.rit_enabled() && self.state.mode() != OperatingMode::Cw {
            if previous < SIDEBAND_CROSSOVER_HZ && target > SIDEBAND_CROSSOVER_HZ {
                self.state.set_live_mode(OperatingMode::Usb);
            } else if previous > SIDEBAND_CROSSOVER_HZ && target < SIDEBAND_CROSSOVER_HZ {
                self.state.set_live_mode(OperatingMode::Lsb);
            }
        }
        self.apply_frequency();
    }

    /// Move to the band starting at `base_hz`, keeping the offset into the band
    pub fn switch_band(&mut self, base_hz: u32) -> Result<(), ControlError> {
        if self.state.in_transmit() {
            return Err(ControlError::Transmitting);
        }

        let current = self.state.frequency_hz();
        let offset = if (3_500_000..=4_000_000).contains(&current) {
            current - 3_500_000
        } else if (24_800_000..=25_000_000).contains(&current) {
            current - 24_800_000
        } else {
            current % 1_000_000
        };

        self.state.set_live_frequency(base_hz.saturating_add(offset))?;
        self.apply_frequency();
        self.state.save_vfos(&mut self.store);
        info!("Band switched to {} Hz", self.state.frequency_hz());
        Ok(())
    }

    /// Start RIT; the current frequency becomes the transmit frequency
    pub fn rit_enable(&mut self) -> Result<(), ControlError> {
        if self.state.in_transmit() {
            return Err(ControlError::Transmitting);
        }
        self.state.rit_enable(self.state.frequency_hz());
        self.record(RigEvent::RitChanged(true));
        Ok(())
    }

    /// Stop RIT and return to the transmit frequency
    pub fn rit_disable(&mut self) {
        if self.state.rit_disable() {
            self.apply_frequency();
            self.record(RigEvent::RitChanged(false));
        }
    }

    pub fn toggle_split(&mut self) {
        let enabled = !self.state.split_enabled();
        self.set_split(enabled);
    }

    /// A=B: copy the active channel into the other, split and RIT off
    pub fn reset_vfos(&mut self) -> Result<(), ControlError> {
        if self.state.in_transmit() {
            return Err(ControlError::Transmitting);
        }
        let had_rit = self.state.rit_enabled();
        self.state.reset_vfos();
        self.state.save_vfos(&mut self.store);
        self.apply_frequency();
        if had_rit {
            self.record(RigEvent::RitChanged(false));
        }
        self.record(RigEvent::SplitChanged(false));
        Ok(())
    }

    /// Set and persist the keyer speed setting
    pub fn set_cw_speed(&mut self, speed: u16) {
        let speed = u32::from(speed).clamp(*CW_SPEED_RANGE.start(), *CW_SPEED_RANGE.end());
        self.store.put(keys::CW_SPEED, speed);
        self.keyer.set_speed(u16::try_from(speed).unwrap_or(DEFAULT_CW_SPEED));
        debug!(speed, dit = self.keyer.config().dit_length_ticks, "CW speed set");
    }

    /// Set and persist the side-tone pitch, which is also the CW transmit offset
    pub fn set_sidetone(&mut self, hz: u32) {
        self.sidetone_hz = hz.clamp(*SIDETONE_RANGE_HZ.start(), *SIDETONE_RANGE_HZ.end());
        self.store.put(keys::CW_SIDETONE, self.sidetone_hz);
        if self.state.mode() == OperatingMode::Cw {
            self.apply_frequency();
        }
    }

    /// Set and persist the carrier oscillator frequency
    pub fn set_carrier(&mut self, hz: u32) -> Result<(), ControlError> {
        if !CARRIER_RANGE_HZ.contains(&hz) {
            return Err(ControlError::FrequencyOutOfRange { hz });
        }
        self.carrier_hz = hz;
        self.store.put(keys::USB_CAL, hz);
        self.apply_frequency();
        Ok(())
    }

    /// Set and persist the VCO calibration offset
    pub fn set_calibration(&mut self, calibration: i32) {
        self.synth.set_calibration(calibration);
        self.store.put(keys::MASTER_CAL, calibration as u32);
        info!(calibration, vco = self.synth.vco_hz(), "Calibration set");
        self.apply_frequency();
    }

    /// Set and persist the keyer mode
    pub fn set_keyer_mode(&mut self, mode: KeyerMode) {
        self.keyer.set_mode(mode);
        self.store.put(keys::CW_KEY_TYPE, mode.stored());
        self.record(RigEvent::KeyerModeChanged(mode));
    }

    /// Switch CW on or off
    ///
    /// Turning CW on restarts the keyer, which picks its mode from the
    /// paddle held at that moment. Turning it off returns to the
    /// conventional sideband for the frequency.
    pub fn enable_cw(&mut self, enabled: bool) -> Result<(), ControlError> {
        if self.state.in_transmit() {
            return Err(ControlError::Transmitting);
        }

        if enabled {
            self.state.set_live_mode(OperatingMode::Cw);
            self.start_keyer();
        } else {
            let sideband = OperatingMode::sideband_for(self.state.frequency_hz());
            self.state.set_live_mode(sideband);
        }
        self.set_key(false);
        self.set_sidetone_output(false);
        self.apply_frequency();
        Ok(())
    }

    fn start_keyer(&mut self) {
        let mode = self.keyer.start(&mut self.hardware);
        self.store.put(keys::CW_KEY_TYPE, mode.stored());
        self.record(RigEvent::KeyerModeChanged(mode));
    }

    fn apply_keyer_output(&mut self, out: KeyerOutput) {
        match out.transmit {
            Some(TransmitRequest::Enter) => self.begin_transmit(PttTrigger::Hardware),
            Some(TransmitRequest::Leave) if !self.state.soft_ptt_latched() => {
                self.end_transmit(PttTrigger::Hardware)
            }
            _ => {}
        }
        if let Some(closed) = out.key {
            self.set_key(closed);
        }
        if let Some(on) = out.sidetone {
            self.set_sidetone_output(on);
        }
        if let Some(element) = out.element {
            self.record(RigEvent::ElementSent(element));
        }
    }

    /// PTT is active low
    fn poll_ptt(&mut self) {
        let now = self.hardware.now_ticks();
        if let Some(keyed_at) = self.ptt_keyed_at {
            if now.wrapping_sub(keyed_at) < PTT_DEBOUNCE_MS {
                return;
            }
            self.ptt_keyed_at = None;
        }
        if self.state.soft_ptt_latched() {
            return;
        }

        let pressed = !self.hardware.read_digital(InputLine::Ptt);
        if pressed && !self.state.in_transmit() {
            self.begin_transmit(PttTrigger::Hardware);
            self.ptt_keyed_at = Some(now);
        } else if !pressed && self.state.in_transmit() {
            self.end_transmit(PttTrigger::Hardware);
        }
    }

    fn begin_transmit(&mut self, trigger: PttTrigger) {
        if self.state.enter_transmit(trigger) {
            self.hardware.set_output(OutputLine::TxRx, true);
            self.apply_frequency();
            self.record(RigEvent::TransmitChanged {
                transmitting: true,
                trigger,
            });
        }
    }

    fn end_transmit(&mut self, trigger: PttTrigger) {
        if self.state.leave_transmit(trigger) {
            self.hardware.set_output(OutputLine::TxRx, false);
            self.apply_frequency();
            self.record(RigEvent::TransmitChanged {
                transmitting: false,
                trigger,
            });
        }
    }

    fn set_key(&mut self, closed: bool) {
        self.hardware.set_output(OutputLine::CwKey, closed);
        self.record(RigEvent::KeyChanged(closed));
    }

    fn set_sidetone_output(&mut self, on: bool) {
        self.hardware.set_output(OutputLine::Sidetone, on);
        self.record(RigEvent::SidetoneChanged(on));
    }
}

impl<H, S> RigControl for Rig<H, S>
where
    H: RigHardware,
    S: PersistentStore,
{
    fn frequency(&self) -> u32 {
        self.state.frequency_hz()
    }

    fn set_frequency(&mut self, hz: u32) -> Result<(), ControlError> {
        self.state.set_live_frequency(hz)?;
        self.apply_frequency();
        Ok(())
    }

    fn mode(&self) -> OperatingMode {
        self.state.mode()
    }

    fn set_mode(&mut self, mode: OperatingMode) {
        let entering_cw = mode == OperatingMode::Cw && self.state.mode() != OperatingMode::Cw;
        self.state.set_live_mode(mode);
        if entering_cw {
            self.start_keyer();
        }
        if self.state.rit_disable() {
            self.record(RigEvent::RitChanged(false));
        }
        self.apply_frequency();
    }

    fn active_vfo(&self) -> Vfo {
        self.state.active_vfo()
    }

    fn select_vfo(&mut self, which: Vfo) {
        if self.state.select_vfo(which, &mut self.store) {
            self.apply_frequency();
            self.record(RigEvent::VfoChanged(which));
        }
    }

    fn equalize_vfo(&mut self, target: Vfo) {
        if self.state.equalize(target) {
            self.apply_frequency();
        }
    }

    fn swap_vfos(&mut self) {
        let before = self.state.active_vfo();
        self.state.swap();
        self.apply_frequency();
        if self.state.active_vfo() != before {
            self.record(RigEvent::VfoChanged(self.state.active_vfo()));
        }
    }

    fn split_enabled(&self) -> bool {
        self.state.split_enabled()
    }

    fn set_split(&mut self, enabled: bool) {
        if self.state.split_enabled() != enabled {
            self.state.set_split(enabled);
            info!(enabled, "Split");
            self.record(RigEvent::SplitChanged(enabled));
        }
    }

    fn enter_transmit(&mut self, trigger: PttTrigger) {
        self.begin_transmit(trigger);
    }

    fn leave_transmit(&mut self, trigger: PttTrigger) {
        self.end_transmit(trigger);
    }

    fn rig_address(&self) -> u8 {
        self.config.rig_address
    }
}

fn stored_or<S>(store: &S, key: u16, range: std::ops::RangeInclusive<u32>, default: u32) -> u32
where
    S: PersistentStore + ?Sized,
{
    let value = store.get(key);
    if range.contains(&value) {
        value
    } else {
        default
    }
}
