//! CI-V command dispatcher
//!
//! Frames addressed to the rig are routed through a fixed 32-entry table of
//! handlers, one per command code. Replies reuse the request header with
//! the addresses swapped and take one of three shapes:
//!
//! ```text
//! [src] [dest] [cmd] [data...] FD    query reply
//! [src] [dest] FB FD                 OK
//! [src] [dest] FA FD                 NG
//! (nothing)                          fire-and-forget
//! ```
//!
//! Most of the legacy command space is deliberately unimplemented and
//! always answers NG.

use pbitx_protocol::{
    decode_frequency, encode_frequency, vfo_op, CivFrame, CommandCode, OperatingMode, Vfo,
    COMMAND_SPACE, NOT_GOOD, OK, SEPARATOR, TERMINATOR,
};
use tracing::debug;

use crate::error::{ControlError, DispatchError};
use crate::sequencer::PttTrigger;

/// Lower band edge reported to controllers
pub const BAND_EDGE_LOW_HZ: u32 = 3_500_000;
/// Upper band edge reported to controllers
pub const BAND_EDGE_HIGH_HZ: u32 = 30_000_000;

/// Fixed filter byte reported with the mode
const FILTER_NARROW: u8 = 0x02;

/// Operations the dispatcher drives
pub trait RigControl {
    /// Live frequency in Hz
    fn frequency(&self) -> u32;
    /// Tune the live VFO and apply it
    fn set_frequency(&mut self, hz: u32) -> Result<(), ControlError>;
    fn mode(&self) -> OperatingMode;
    fn set_mode(&mut self, mode: OperatingMode);
    fn active_vfo(&self) -> Vfo;
    fn select_vfo(&mut self, which: Vfo);
    /// Copy the other VFO into `target`
    fn equalize_vfo(&mut self, target: Vfo);
    fn swap_vfos(&mut self);
    fn split_enabled(&self) -> bool;
    fn set_split(&mut self, enabled: bool);
    fn enter_transmit(&mut self, trigger: PttTrigger);
    fn leave_transmit(&mut self, trigger: PttTrigger);
    /// CI-V address reported by the rig-id query
    fn rig_address(&self) -> u8;
}

/// Reply to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Nothing goes back on the wire
    Silent,
    /// Frame to send
    Reply(CivFrame),
}

impl Response {
    /// Query reply carrying `payload`
    pub fn data(request: &CivFrame, payload: &[u8]) -> Self {
        Response::Reply(CivFrame::new(
            request.src,
            request.dest,
            request.command,
            payload,
        ))
    }

    pub fn ok(request: &CivFrame) -> Self {
        Self::status(request, OK)
    }

    pub fn not_good(request: &CivFrame) -> Self {
        Self::status(request, NOT_GOOD)
    }

    fn status(request: &CivFrame, status: u8) -> Self {
        Response::Reply(CivFrame::new(request.src, request.dest, status, &[]))
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Response::Silent)
    }

    pub fn frame(&self) -> Option<&CivFrame> {
        match self {
            Response::Silent => None,
            Response::Reply(frame) => Some(frame),
        }
    }

    /// `Some(OK)` or `Some(NOT_GOOD)` for status replies
    pub fn status_byte(&self) -> Option<u8> {
        self.frame()
            .map(|f| f.command)
            .filter(|&c| c == OK || c == NOT_GOOD)
    }

    /// Wire bytes, preamble included; empty when silent
    pub fn encode(&self) -> Vec<u8> {
        self.frame().map(CivFrame::encode).unwrap_or_default()
    }
}

type Handler = fn(&mut dyn RigControl, &CivFrame) -> Result<Response, DispatchError>;

const HANDLERS: [Handler; COMMAND_SPACE] = [
    set_frequency_data, // 0x00
    set_mode_data,      // 0x01
    read_band_edges,    // 0x02
    read_frequency,     // 0x03
    read_mode,          // 0x04
    set_frequency,      // 0x05
    set_mode_filter,    // 0x06
    select_vfo,         // 0x07
    unimplemented,      // 0x08 memory mode
    unimplemented,      // 0x09 memory write
    unimplemented,      // 0x0A memory to VFO
    unimplemented,      // 0x0B memory clear
    unimplemented,      // 0x0C read duplex offset
    unimplemented,      // 0x0D set duplex offset
    unimplemented,      // 0x0E scan
    split,              // 0x0F
    unimplemented,      // 0x10 tuning step
    unimplemented,      // 0x11 attenuator
    unimplemented,      // 0x12 antenna
    unimplemented,      // 0x13 announce
    unimplemented,      // 0x14 levels
    unimplemented,      // 0x15 meters
    unimplemented,      // 0x16 preamp/AGC
    unimplemented,      // 0x17
    unimplemented,      // 0x18 power on/off
    read_rig_id,        // 0x19
    unimplemented,      // 0x1A
    unimplemented,      // 0x1B
    transmit,           // 0x1C
    unimplemented,      // 0x1D
    unimplemented,      // 0x1E
    unimplemented,      // 0x1F
];

/// Run the handler for `frame` and build the reply
///
/// Never fails: every error becomes an NG reply.
pub fn dispatch(rig: &mut dyn RigControl, frame: &CivFrame) -> Response {
    let result = match HANDLERS.get(usize::from(frame.command)) {
        Some(handler) => handler(rig, frame),
        None => Err(DispatchError::UnsupportedCommand(frame.command)),
    };

    match result {
        Ok(response) => {
            debug!(
                "CI-V {} handled",
                CommandCode::from_u8(frame.command).map_or("?", CommandCode::name)
            );
            response
        }
        Err(e) => {
            debug!("CI-V 0x{:02X} answered NG: {}", frame.command, e);
            Response::not_good(frame)
        }
    }
}

fn decode_payload_frequency(frame: &CivFrame) -> Result<u32, DispatchError> {
    Ok(decode_frequency(frame.data(), TERMINATOR)?)
}

fn set_frequency_data(rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    let hz = decode_payload_frequency(frame)?;
    rig.set_frequency(hz)?;
    Ok(Response::Silent)
}

// Silent on success; an unknown mode byte answers NG instead of being dropped.
fn set_mode_data(rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    let code = frame
        .arg(0)
        .ok_or_else(|| DispatchError::rejected(frame.command, "missing mode"))?;
    rig.set_mode(OperatingMode::try_from(code)?);
    Ok(Response::Silent)
}

fn read_band_edges(_rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    let mut payload = Vec::with_capacity(11);
    payload.extend_from_slice(&encode_frequency(BAND_EDGE_LOW_HZ));
    payload.push(SEPARATOR);
    payload.extend_from_slice(&encode_frequency(BAND_EDGE_HIGH_HZ));
    Ok(Response::data(frame, &payload))
}

fn read_frequency(rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    Ok(Response::data(frame, &encode_frequency(rig.frequency())))
}

fn read_mode(rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    Ok(Response::data(frame, &[rig.mode().civ_code(), FILTER_NARROW]))
}

fn set_frequency(rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    let hz = decode_payload_frequency(frame)?;
    rig.set_frequency(hz)?;
    Ok(Response::ok(frame))
}

fn set_mode_filter(_rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    Err(DispatchError::rejected(frame.command, "filter bandwidth is fixed"))
}

fn select_vfo(rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    match frame.arg(0) {
        Some(vfo_op::SELECT_A) => rig.select_vfo(Vfo::A),
        Some(vfo_op::SELECT_B) => rig.select_vfo(Vfo::B),
        Some(vfo_op::EQUALIZE) => rig.equalize_vfo(Vfo::A),
        Some(vfo_op::SWAP) => rig.swap_vfos(),
        other => {
            return Err(DispatchError::rejected(
                frame.command,
                format!("VFO operation {:02X?}", other),
            ))
        }
    }
    Ok(Response::ok(frame))
}

fn split(rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    match frame.payload() {
        [] => Ok(Response::data(frame, &[u8::from(rig.split_enabled())])),
        [0x00] => {
            rig.set_split(false);
            Ok(Response::ok(frame))
        }
        [0x01] => {
            rig.set_split(true);
            Ok(Response::ok(frame))
        }
        other => Err(DispatchError::rejected(
            frame.command,
            format!("split argument {:02X?}", other),
        )),
    }
}

fn read_rig_id(rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    Ok(Response::data(frame, &[0x00, rig.rig_address()]))
}

fn transmit(rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    // Accept both the bare form and the 0x00 sub-command form
    let value = match frame.payload() {
        [value] | [0x00, value] => *value,
        other => {
            return Err(DispatchError::rejected(
                frame.command,
                format!("transmit argument {:02X?}", other),
            ))
        }
    };

    match value {
        0x00 => rig.leave_transmit(PttTrigger::Soft),
        0x01 => rig.enter_transmit(PttTrigger::Soft),
        _ => {
            return Err(DispatchError::rejected(
                frame.command,
                format!("transmit value 0x{:02X}", value),
            ))
        }
    }
    Ok(Response::ok(frame))
}

fn unimplemented(_rig: &mut dyn RigControl, frame: &CivFrame) -> Result<Response, DispatchError> {
    Err(DispatchError::UnsupportedCommand(frame.command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbitx_protocol::{CONTROLLER_ADDRESS, RIG_ADDRESS};
    use proptest::prelude::*;

    /// Records the calls the dispatcher makes
    struct FakeRig {
        frequency: u32,
        mode: OperatingMode,
        active: Vfo,
        split: bool,
        transmit: Vec<(bool, PttTrigger)>,
        vfo_ops: Vec<&'static str>,
    }

    impl Default for FakeRig {
        fn default() -> Self {
            Self {
                frequency: 7_150_000,
                mode: OperatingMode::Lsb,
                active: Vfo::A,
                split: false,
                transmit: Vec::new(),
                vfo_ops: Vec::new(),
            }
        }
    }

    impl RigControl for FakeRig {
        fn frequency(&self) -> u32 {
            self.frequency
        }
        fn set_frequency(&mut self, hz: u32) -> Result<(), ControlError> {
            if !crate::synth::is_supported(hz) {
                return Err(ControlError::FrequencyOutOfRange { hz });
            }
            self.frequency = hz;
            Ok(())
        }
        fn mode(&self) -> OperatingMode {
            self.mode
        }
        fn set_mode(&mut self, mode: OperatingMode) {
            self.mode = mode;
        }
        fn active_vfo(&self) -> Vfo {
            self.active
        }
        fn select_vfo(&mut self, which: Vfo) {
            self.active = which;
            self.vfo_ops.push("select");
        }
        fn equalize_vfo(&mut self, _target: Vfo) {
            self.vfo_ops.push("equalize");
        }
        fn swap_vfos(&mut self) {
            self.vfo_ops.push("swap");
        }
        fn split_enabled(&self) -> bool {
            self.split
        }
        fn set_split(&mut self, enabled: bool) {
            self.split = enabled;
        }
        fn enter_transmit(&mut self, trigger: PttTrigger) {
            self.transmit.push((true, trigger));
        }
        fn leave_transmit(&mut self, trigger: PttTrigger) {
            self.transmit.push((false, trigger));
        }
        fn rig_address(&self) -> u8 {
            RIG_ADDRESS
        }
    }

    fn request(command: u8, payload: &[u8]) -> CivFrame {
        CivFrame::to_rig(command, payload)
    }

    #[test]
    fn test_reply_header_swaps_addresses() {
        let mut rig = FakeRig::default();
        let response = dispatch(&mut rig, &request(0x03, &[]));
        let frame = response.frame().unwrap();
        assert_eq!(frame.dest, CONTROLLER_ADDRESS);
        assert_eq!(frame.src, RIG_ADDRESS);
        assert_eq!(frame.command, 0x03);
    }

    #[test]
    fn test_read_frequency() {
        let mut rig = FakeRig::default();
        let response = dispatch(&mut rig, &request(0x03, &[]));
        assert_eq!(
            response.encode(),
            vec![0xFE, 0xFE, 0xE0, 0xA1, 0x03, 0x00, 0x00, 0x15, 0x07, 0x00, 0xFD]
        );
    }

    #[test]
    fn test_set_frequency_acknowledges() {
        let mut rig = FakeRig::default();
        let response = dispatch(&mut rig, &request(0x05, &encode_frequency(14_070_000)));
        assert_eq!(response.status_byte(), Some(OK));
        assert_eq!(response.encode(), vec![0xFE, 0xFE, 0xE0, 0xA1, 0xFB, 0xFD]);
        assert_eq!(rig.frequency, 14_070_000);
    }

    #[test]
    fn test_set_frequency_data_is_silent() {
        let mut rig = FakeRig::default();
        let response = dispatch(&mut rig, &request(0x00, &encode_frequency(21_074_000)));
        assert!(response.is_silent());
        assert!(response.encode().is_empty());
        assert_eq!(rig.frequency, 21_074_000);
    }

    #[test]
    fn test_set_frequency_out_of_range_is_rejected() {
        let mut rig = FakeRig::default();
        let response = dispatch(&mut rig, &request(0x05, &encode_frequency(120_000_000)));
        assert_eq!(response.status_byte(), Some(NOT_GOOD));
        assert_eq!(rig.frequency, 7_150_000);

        let response = dispatch(&mut rig, &request(0x05, &[0x0A, 0x00]));
        assert_eq!(response.status_byte(), Some(NOT_GOOD));
    }

    #[test]
    fn test_set_mode() {
        let mut rig = FakeRig::default();
        assert!(dispatch(&mut rig, &request(0x01, &[0x03, 0x00])).is_silent());
        assert_eq!(rig.mode, OperatingMode::Cw);

        let response = dispatch(&mut rig, &request(0x01, &[0x05]));
        assert_eq!(response.status_byte(), Some(NOT_GOOD));
        assert_eq!(rig.mode, OperatingMode::Cw);
    }

    #[test]
    fn test_read_mode() {
        let mut rig = FakeRig::default();
        rig.mode = OperatingMode::Usb;
        let response = dispatch(&mut rig, &request(0x04, &[]));
        assert_eq!(response.frame().unwrap().payload(), &[0x01, 0x02]);
    }

    #[test]
    fn test_band_edges() {
        let mut rig = FakeRig::default();
        let response = dispatch(&mut rig, &request(0x02, &[]));
        assert_eq!(
            response.frame().unwrap().payload(),
            &[0x00, 0x00, 0x50, 0x03, 0x00, 0x2D, 0x00, 0x00, 0x00, 0x30, 0x00]
        );
    }

    #[test]
    fn test_vfo_operations() {
        let mut rig = FakeRig::default();
        for (arg, op) in [(0x01, "select"), (0x00, "select"), (0xA0, "equalize"), (0xB0, "swap")] {
            let response = dispatch(&mut rig, &request(0x07, &[arg]));
            assert_eq!(response.status_byte(), Some(OK));
            assert_eq!(rig.vfo_ops.last(), Some(&op));
        }
        assert_eq!(dispatch(&mut rig, &request(0x07, &[0x02])).status_byte(), Some(NOT_GOOD));
        assert_eq!(dispatch(&mut rig, &request(0x07, &[])).status_byte(), Some(NOT_GOOD));
    }

    #[test]
    fn test_split() {
        let mut rig = FakeRig::default();
        assert_eq!(dispatch(&mut rig, &request(0x0F, &[0x01])).status_byte(), Some(OK));
        assert!(rig.split);
        let query = dispatch(&mut rig, &request(0x0F, &[]));
        assert_eq!(query.frame().unwrap().payload(), &[0x01]);
        assert_eq!(dispatch(&mut rig, &request(0x0F, &[0x00])).status_byte(), Some(OK));
        assert!(!rig.split);
        assert_eq!(dispatch(&mut rig, &request(0x0F, &[0x10])).status_byte(), Some(NOT_GOOD));
    }

    #[test]
    fn test_read_rig_id() {
        let mut rig = FakeRig::default();
        let bytes = dispatch(&mut rig, &request(0x19, &[0x00])).encode();
        assert_eq!(bytes.last(), Some(&TERMINATOR));
        assert!(bytes[5..].contains(&RIG_ADDRESS));
        assert_eq!(bytes, vec![0xFE, 0xFE, 0xE0, 0xA1, 0x19, 0x00, 0xA1, 0xFD]);
    }

    #[test]
    fn test_transmit_uses_soft_trigger() {
        let mut rig = FakeRig::default();
        assert_eq!(dispatch(&mut rig, &request(0x1C, &[0x01])).status_byte(), Some(OK));
        assert_eq!(dispatch(&mut rig, &request(0x1C, &[0x00, 0x00])).status_byte(), Some(OK));
        assert_eq!(
            rig.transmit,
            vec![(true, PttTrigger::Soft), (false, PttTrigger::Soft)]
        );
        assert_eq!(dispatch(&mut rig, &request(0x1C, &[0x02])).status_byte(), Some(NOT_GOOD));
        assert_eq!(rig.transmit.len(), 2);
    }

    #[test]
    fn test_unimplemented_answers_plain_ng() {
        let mut rig = FakeRig::default();
        let response = dispatch(&mut rig, &request(0x1A, &[0x05, 0x00]));
        assert_eq!(response.encode(), vec![0xFE, 0xFE, 0xE0, 0xA1, 0xFA, 0xFD]);
        assert_eq!(
            dispatch(&mut rig, &request(0x06, &[0x01, 0x01])).status_byte(),
            Some(NOT_GOOD)
        );
    }

    #[test]
    fn test_command_outside_table() {
        let mut rig = FakeRig::default();
        let response = dispatch(&mut rig, &request(0x20, &[]));
        assert_eq!(response.status_byte(), Some(NOT_GOOD));
    }

    proptest! {
        #[test]
        fn every_frame_gets_an_answer_or_silence(command in any::<u8>(), payload in proptest::collection::vec(0u8..0xFD, 0..8)) {
            let mut rig = FakeRig::default();
            let response = dispatch(&mut rig, &request(command, &payload));
            if let Some(frame) = response.frame() {
                prop_assert_eq!(frame.data().last(), Some(&TERMINATOR));
                prop_assert_eq!(frame.dest, CONTROLLER_ADDRESS);
            } else {
                prop_assert!(command == 0x00 || command == 0x01);
            }
        }
    }
}
