//! Virtual radio
//!
//! A booted [`Rig`] on a [`VirtualBoard`], fed raw CI-V bytes through a
//! streaming frame codec. Everything here is synchronous; the async task in
//! [`crate::radio_task`] drives it from a byte stream and a timer.

use pbitx_control::{PersistentStore, RadioConfig, Rig, RigEvent};
use pbitx_protocol::FrameCodec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{VirtualBoard, PADDLE_OPEN_LEVEL};

/// Configuration for creating a virtual radio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualRadioConfig {
    /// Display name/identifier
    pub id: String,
    /// Polling-loop period in milliseconds
    pub tick_interval_ms: u64,
    /// Board constants
    pub rig: RadioConfig,
    /// Paddle line level at power-on
    pub initial_paddle_level: u16,
}

impl Default for VirtualRadioConfig {
    fn default() -> Self {
        Self {
            id: "pBitx".to_string(),
            tick_interval_ms: 5,
            rig: RadioConfig::default(),
            initial_paddle_level: PADDLE_OPEN_LEVEL,
        }
    }
}

/// A simulated pBitx answering CI-V
pub struct VirtualRadio<S> {
    id: String,
    tick_interval_ms: u64,
    rig: Rig<VirtualBoard, S>,
    codec: FrameCodec,
}

impl<S: PersistentStore> VirtualRadio<S> {
    /// Power on with settings from `store`
    pub fn new(config: VirtualRadioConfig, store: S) -> Self {
        let mut board = VirtualBoard::new();
        board.set_paddle_level(config.initial_paddle_level);
        Self {
            id: config.id,
            tick_interval_ms: config.tick_interval_ms.max(1),
            rig: Rig::boot(config.rig, board, store),
            codec: FrameCodec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    pub fn rig(&self) -> &Rig<VirtualBoard, S> {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut Rig<VirtualBoard, S> {
        &mut self.rig
    }

    pub fn board(&self) -> &VirtualBoard {
        self.rig.hardware()
    }

    pub fn board_mut(&mut self) -> &mut VirtualBoard {
        self.rig.hardware_mut()
    }

    /// Feed received bytes and return every reply they produce
    pub fn process_bytes(&mut self, data: &[u8]) -> Vec<u8> {
        self.codec.push_bytes(data);

        let mut replies = Vec::new();
        while let Some(frame) = self.codec.next_frame() {
            debug!("{} processing CI-V frame: {:02X?}", self.id, frame);
            replies.extend(self.rig.handle_frame(&frame));
        }
        replies
    }

    /// Advance the board clock by one tick period and run the rig loop once
    pub fn tick(&mut self) {
        let elapsed = u32::try_from(self.tick_interval_ms).unwrap_or(u32::MAX);
        self.rig.hardware_mut().advance(elapsed);
        self.rig.tick();
    }

    pub fn drain_events(&mut self) -> Vec<RigEvent> {
        self.rig.drain_events()
    }
}
