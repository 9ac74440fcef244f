//! Integration tests for the pBitx control core
//!
//! These tests drive a booted [`Rig`] the way the outside world does:
//! - CI-V frames from a controller
//! - The PTT line and the paddle through the board traits
//! - Settings restored from and written to the store

use pbitx_control::{
    AnalogChannel, AnalogInput, BusTransport, Clock, DigitalInput, Element, InputLine, KeyerMode,
    MemoryStore, OutputLine, OutputLines, PersistentStore, PttTrigger, RadioConfig, Rig, RigEvent,
};
use pbitx_control::store::keys;
use pbitx_protocol::{
    encode_frequency, CivFrame, FrameCodec, OperatingMode, Vfo, NOT_GOOD, OK, TERMINATOR,
};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;
    use std::collections::HashMap;

    pub const PADDLE_OPEN: u16 = 0xF00;
    pub const PADDLE_DASH: u16 = 0x900;
    pub const PADDLE_BOTH: u16 = 0x300;

    /// Board double with settable inputs
    #[derive(Default)]
    pub struct TestBoard {
        pub register_writes: usize,
        pub outputs: HashMap<OutputLine, bool>,
        pub paddle: u16,
        pub ptt_high: bool,
        pub now: u32,
    }

    impl TestBoard {
        pub fn idle() -> Self {
            Self {
                paddle: PADDLE_OPEN,
                ptt_high: true,
                ..Self::default()
            }
        }

        pub fn output(&self, line: OutputLine) -> bool {
            self.outputs.get(&line).copied().unwrap_or(false)
        }
    }

    impl BusTransport for TestBoard {
        fn write_registers(&mut self, _start: u8, _bytes: &[u8]) {
            self.register_writes += 1;
        }
    }

    impl AnalogInput for TestBoard {
        fn sample_analog(&mut self, _channel: AnalogChannel) -> u16 {
            self.paddle
        }
    }

    impl DigitalInput for TestBoard {
        fn read_digital(&mut self, _line: InputLine) -> bool {
            self.ptt_high
        }
    }

    impl OutputLines for TestBoard {
        fn set_output(&mut self, line: OutputLine, high: bool) {
            self.outputs.insert(line, high);
        }
    }

    impl Clock for TestBoard {
        fn now_ticks(&self) -> u32 {
            self.now
        }
    }

    pub fn boot(store: MemoryStore) -> Rig<TestBoard, MemoryStore> {
        Rig::boot(RadioConfig::default(), TestBoard::idle(), store)
    }

    pub fn boot_default() -> Rig<TestBoard, MemoryStore> {
        boot(MemoryStore::new())
    }

    /// Send a controller frame and return the reply bytes
    pub fn civ(rig: &mut Rig<TestBoard, MemoryStore>, command: u8, payload: &[u8]) -> Vec<u8> {
        rig.handle_frame(&CivFrame::to_rig(command, payload))
    }

    /// Status byte of a reply, if it is a status reply
    pub fn status(reply: &[u8]) -> Option<u8> {
        match reply {
            [0xFE, 0xFE, _, _, status, TERMINATOR] if *status == OK || *status == NOT_GOOD => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn elements(events: &[RigEvent]) -> Vec<Element> {
        events
            .iter()
            .filter_map(|e| match e {
                RigEvent::ElementSent(element) => Some(*element),
                _ => None,
            })
            .collect()
    }
}

use helpers::*;

// ============================================================================
// CI-V Round Trips
// ============================================================================

mod civ_round_trips {
    use super::*;

    #[test]
    fn test_set_then_read_frequency() {
        let mut rig = boot_default();

        let reply = civ(&mut rig, 0x05, &encode_frequency(14_070_000));
        assert_eq!(reply, vec![0xFE, 0xFE, 0xE0, 0xA1, 0xFB, 0xFD]);

        let reply = civ(&mut rig, 0x03, &[]);
        assert_eq!(
            reply,
            vec![0xFE, 0xFE, 0xE0, 0xA1, 0x03, 0x00, 0x00, 0x07, 0x14, 0x00, 0xFD]
        );
    }

    #[test]
    fn test_codec_to_rig_to_reply() {
        let mut rig = boot_default();
        let mut codec = FrameCodec::new();

        // Split across two reads, with line noise in front
        codec.push_bytes(&[0x00, 0xFE, 0xFE, 0xA1, 0xE0, 0x05, 0x00, 0x00]);
        assert!(codec.next_frame().is_none());
        codec.push_bytes(&[0x07, 0x14, 0x00, 0xFD]);

        let frame = codec.next_frame().unwrap();
        assert_eq!(status(&rig.handle_frame(&frame)), Some(OK));
        assert_eq!(rig.state().frequency_hz(), 14_070_000);
    }

    #[test]
    fn test_read_rig_id() {
        let mut rig = boot_default();
        let reply = civ(&mut rig, 0x19, &[0x00]);
        assert_eq!(reply.last(), Some(&TERMINATOR));
        assert!(reply[5..].contains(&0xA1));
    }

    #[test]
    fn test_unsupported_command_is_plain_ng() {
        let mut rig = boot_default();
        assert_eq!(civ(&mut rig, 0x1A, &[0x05, 0x00, 0x01]), vec![0xFE, 0xFE, 0xE0, 0xA1, 0xFA, 0xFD]);
    }

    #[test]
    fn test_read_mode_follows_tuning() {
        let mut rig = boot_default();
        assert_eq!(&civ(&mut rig, 0x04, &[])[5..], &[0x00, 0x02, 0xFD]);
        rig.switch_band(14_000_000).unwrap();
        rig.tune(1);
        // Band switching keeps the mode; tuning within a band does not cross 10 MHz
        assert_eq!(&civ(&mut rig, 0x04, &[])[5..], &[0x00, 0x02, 0xFD]);
        assert!(civ(&mut rig, 0x01, &[0x01]).is_empty());
        assert_eq!(&civ(&mut rig, 0x04, &[])[5..], &[0x01, 0x02, 0xFD]);
    }

    #[test]
    fn test_out_of_range_frequency_rejected() {
        let mut rig = boot_default();
        assert_eq!(status(&civ(&mut rig, 0x05, &encode_frequency(400_000))), Some(NOT_GOOD));
        assert_eq!(rig.state().frequency_hz(), 7_150_000);
    }
}

// ============================================================================
// VFO Management
// ============================================================================

mod vfo_management {
    use super::*;

    fn rig_with_b_on_20m() -> Rig<TestBoard, MemoryStore> {
        let mut store = MemoryStore::new();
        store.put(keys::VFO_A, 7_150_000);
        store.put(keys::VFO_B, 14_200_000);
        boot(store)
    }

    #[test]
    fn test_swap_with_a_active() {
        let mut rig = rig_with_b_on_20m();
        assert_eq!(status(&civ(&mut rig, 0x07, &[0xB0])), Some(OK));
        assert_eq!(rig.state().active_vfo(), Vfo::A);
        assert_eq!(rig.state().frequency_hz(), 14_200_000);
        assert_eq!(rig.state().channel(Vfo::B).frequency_hz, 7_150_000);
        // Modes stay with their channels
        assert_eq!(rig.state().mode(), OperatingMode::Lsb);
    }

    #[test]
    fn test_swap_with_b_active_returns_to_a() {
        let mut rig = rig_with_b_on_20m();
        civ(&mut rig, 0x07, &[0x01]);
        assert_eq!(rig.state().active_vfo(), Vfo::B);

        civ(&mut rig, 0x07, &[0xB0]);
        assert_eq!(rig.state().active_vfo(), Vfo::A);
        assert_eq!(rig.state().frequency_hz(), 14_200_000);
    }

    #[test]
    fn test_select_persists_both_channels() {
        let mut rig = rig_with_b_on_20m();
        rig.tune(4);
        civ(&mut rig, 0x07, &[0x01]);

        assert_eq!(rig.state().frequency_hz(), 14_200_000);
        assert_eq!(rig.store().get(keys::VFO_A), 7_150_200);
        assert_eq!(rig.store().get(keys::VFO_B), 14_200_000);
        assert!(rig.drain_events().contains(&RigEvent::VfoChanged(Vfo::B)));

        // Selecting the active VFO again changes nothing
        civ(&mut rig, 0x07, &[0x01]);
        assert!(!rig.drain_events().contains(&RigEvent::VfoChanged(Vfo::B)));
    }

    #[test]
    fn test_equalize_copies_b_into_active_a() {
        let mut rig = rig_with_b_on_20m();
        civ(&mut rig, 0x07, &[0xA0]);
        assert_eq!(rig.state().frequency_hz(), 14_200_000);
        assert_eq!(rig.state().mode(), OperatingMode::Usb);
    }

    #[test]
    fn test_settings_survive_reboot() {
        let mut rig = rig_with_b_on_20m();
        rig.switch_band(21_000_000).unwrap();
        rig.set_cw_speed(60);
        rig.set_keyer_mode(KeyerMode::Iambic);

        let store = rig.store().clone();
        let rig = boot(store);
        assert_eq!(rig.state().frequency_hz(), 21_150_000);
        assert_eq!(rig.keyer().speed(), 60);
        assert_eq!(rig.keyer().mode(), KeyerMode::Iambic);
    }
}

// ============================================================================
// Transmit Sequencing
// ============================================================================

mod transmit_sequencing {
    use super::*;

    #[test]
    fn test_ptt_transmission_ignores_civ_off() {
        let mut rig = boot_default();
        rig.hardware_mut().ptt_high = false;
        rig.tick();
        assert!(rig.state().in_transmit());

        assert_eq!(status(&civ(&mut rig, 0x1C, &[0x00, 0x00])), Some(OK));
        assert!(rig.state().in_transmit());

        rig.hardware_mut().ptt_high = true;
        rig.hardware_mut().now = 100;
        rig.tick();
        assert!(!rig.state().in_transmit());
    }

    #[test]
    fn test_civ_transmission_ignores_ptt_release() {
        let mut rig = boot_default();
        civ(&mut rig, 0x1C, &[0x01]);
        assert!(rig.state().in_transmit());
        assert!(rig.hardware().output(OutputLine::TxRx));

        rig.hardware_mut().now = 1_000;
        rig.tick();
        assert!(rig.state().in_transmit());

        civ(&mut rig, 0x1C, &[0x00]);
        assert!(!rig.state().in_transmit());
        assert!(!rig.hardware().output(OutputLine::TxRx));
        let events = rig.drain_events();
        assert!(events.contains(&RigEvent::TransmitChanged {
            transmitting: false,
            trigger: PttTrigger::Soft,
        }));
    }

    #[test]
    fn test_rit_transmits_on_saved_frequency() {
        let mut rig = boot_default();
        rig.rit_enable().unwrap();
        rig.tune(5);
        assert_eq!(rig.state().frequency_hz(), 7_150_500);

        civ(&mut rig, 0x1C, &[0x01]);
        assert_eq!(rig.state().frequency_hz(), 7_150_000);
        civ(&mut rig, 0x1C, &[0x00]);
        assert_eq!(rig.state().frequency_hz(), 7_150_500);
    }

    #[test]
    fn test_split_transmits_on_b() {
        let mut rig = boot_default();
        civ(&mut rig, 0x0F, &[0x01]);
        assert_eq!(&civ(&mut rig, 0x0F, &[])[5..], &[0x01, 0xFD]);

        civ(&mut rig, 0x1C, &[0x01]);
        assert_eq!(rig.state().frequency_hz(), 14_150_000);
        assert_eq!(rig.state().mode(), OperatingMode::Usb);

        civ(&mut rig, 0x1C, &[0x00]);
        assert_eq!(rig.state().frequency_hz(), 7_150_000);
        assert_eq!(rig.state().mode(), OperatingMode::Lsb);
    }
}

// ============================================================================
// CW Keying
// ============================================================================

mod cw_keying {
    use super::*;

    #[test]
    fn test_iambic_squeeze_alternates_from_dash() {
        let mut rig = boot_default();
        rig.hardware_mut().paddle = PADDLE_DASH;
        rig.enable_cw(true).unwrap();
        assert_eq!(rig.keyer().mode(), KeyerMode::Iambic);
        rig.drain_events();

        rig.hardware_mut().paddle = PADDLE_BOTH;
        for _ in 0..70 {
            rig.tick();
        }
        assert_eq!(
            elements(&rig.drain_events()),
            vec![Element::Dash, Element::Dot, Element::Dash]
        );
    }

    #[test]
    fn test_keyer_drops_transmit_after_hang_time() {
        let mut rig = boot_default();
        rig.hardware_mut().paddle = PADDLE_DASH;
        rig.enable_cw(true).unwrap();

        for _ in 0..30 {
            rig.tick();
        }
        assert!(rig.state().in_transmit());
        assert!(rig.hardware().output(OutputLine::CwKey));

        rig.hardware_mut().paddle = PADDLE_OPEN;
        for _ in 0..200 {
            rig.tick();
        }
        assert!(!rig.state().in_transmit());
        assert!(!rig.hardware().output(OutputLine::CwKey));
        assert!(!rig.hardware().output(OutputLine::Sidetone));
    }

    #[test]
    fn test_civ_mode_change_to_cw_starts_keyer() {
        let mut rig = boot_default();
        rig.hardware_mut().paddle = PADDLE_OPEN;
        rig.set_keyer_mode(KeyerMode::Iambic);
        civ(&mut rig, 0x01, &[0x03]);
        assert_eq!(rig.state().mode(), OperatingMode::Cw);
        assert_eq!(rig.keyer().mode(), KeyerMode::Straight);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn arb_frame() -> impl Strategy<Value = (u8, Vec<u8>)> {
        prop_oneof![
            (0u8..0x20, proptest::collection::vec(0u8..0xFD, 0..6)),
            (Just(0x05u8), (500_000u32..109_000_000).prop_map(|hz| encode_frequency(hz).to_vec())),
            (Just(0x1Cu8), proptest::collection::vec(0u8..2, 1..3)),
            (Just(0x07u8), prop_oneof![Just(vec![0x00]), Just(vec![0x01]), Just(vec![0xA0]), Just(vec![0xB0])]),
        ]
    }

    proptest! {
        #[test]
        fn every_reply_is_a_closed_frame(frames in proptest::collection::vec(arb_frame(), 1..20)) {
            let mut rig = boot_default();
            for (command, payload) in frames {
                let reply = civ(&mut rig, command, &payload);
                if !reply.is_empty() {
                    prop_assert_eq!(&reply[..4], &[0xFE, 0xFE, 0xE0, 0xA1]);
                    prop_assert_eq!(reply.last(), Some(&TERMINATOR));
                }
                let hz = rig.state().frequency_hz();
                prop_assert!((500_000..=109_000_000).contains(&hz));
            }
        }

        #[test]
        fn set_frequency_reads_back(hz in 500_000u32..=109_000_000) {
            let mut rig = boot_default();
            prop_assert_eq!(status(&civ(&mut rig, 0x05, &encode_frequency(hz))), Some(OK));
            let reply = civ(&mut rig, 0x03, &[]);
            prop_assert_eq!(&reply[5..10], &encode_frequency(hz)[..]);
        }
    }
}
