//! pBitx Simulation Library
//!
//! This crate runs the pBitx control core without a radio attached. It
//! includes:
//!
//! - **VirtualBoard**: Si5351 register image, paddle and PTT inputs, output
//!   lines and a manual clock
//! - **JsonFileStore**: settings persisted to a JSON file
//! - **VirtualRadio**: a booted rig fed raw CI-V bytes
//! - **run_virtual_radio_task**: an async actor serving CI-V over any byte
//!   stream
//!
//! # Example
//!
//! ```rust
//! use pbitx_control::MemoryStore;
//! use pbitx_protocol::{encode_frequency, CivFrame};
//! use pbitx_sim::{VirtualRadio, VirtualRadioConfig};
//!
//! let mut radio = VirtualRadio::new(VirtualRadioConfig::default(), MemoryStore::new());
//!
//! // Set 14.070 MHz the way a logging program would
//! let request = CivFrame::to_rig(0x05, &encode_frequency(14_070_000)).encode();
//! let reply = radio.process_bytes(&request);
//! assert_eq!(reply, [0xFE, 0xFE, 0xE0, 0xA1, 0xFB, 0xFD]);
//!
//! for event in radio.drain_events() {
//!     println!("Rig event: {:?}", event);
//! }
//! ```

pub mod board;
pub mod radio;
pub mod radio_task;
pub mod store;

pub use board::VirtualBoard;
pub use radio::{VirtualRadio, VirtualRadioConfig};
pub use radio_task::{run_virtual_radio_task, VirtualRadioCommand};
pub use store::{JsonFileStore, StoreError};
