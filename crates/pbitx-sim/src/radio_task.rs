//! Virtual radio actor task
//!
//! This module provides a pure async task that owns a [`VirtualRadio`] and
//! communicates via an async stream. The task uses a select! loop to:
//! - Read CI-V bytes from the connection stream and write back the replies
//! - Run the rig's polling loop on a fixed tick
//! - Handle operator commands (paddle, PTT, tuning) and shutdown
//! - Emit rig events via a broadcast channel

use std::io;
use std::time::Duration;

use pbitx_control::{PersistentStore, RigEvent};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::radio::VirtualRadio;

/// Commands that can be sent to a virtual radio actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualRadioCommand {
    /// Set the raw paddle line level
    SetPaddleLevel(u16),
    /// Press or release the microphone PTT
    SetPtt(bool),
    /// Turn the tuning knob by this many detents
    Tune(i32),
    /// Jump to the band starting at this frequency
    SwitchBand(u32),
    /// Switch CW on or off
    EnableCw(bool),
    /// Shutdown the virtual radio actor
    Shutdown,
}

/// Run the virtual radio actor task
///
/// This task owns the VirtualRadio and processes:
/// 1. CI-V frames read from the stream, answering each on the same stream
/// 2. A periodic tick driving PTT polling and the CW keyer
/// 3. Commands from the command channel
///
/// Rig events are emitted via the broadcast channel for UI subscription.
pub async fn run_virtual_radio_task<T, S>(
    mut stream: T,
    mut radio: VirtualRadio<S>,
    mut cmd_rx: mpsc::Receiver<VirtualRadioCommand>,
    event_tx: broadcast::Sender<RigEvent>,
) -> io::Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: PersistentStore,
{
    let mut buf = [0u8; 1024];
    let mut ticker = interval(Duration::from_millis(radio.tick_interval_ms()));

    info!(
        "Starting virtual radio task for {} ({} ms tick)",
        radio.id(),
        radio.tick_interval_ms()
    );

    // Boot events carry the initial state
    publish(&mut radio, &event_tx);

    loop {
        tokio::select! {
            // Read CI-V bytes from the connection stream
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual radio stream closed for {}", radio.id());
                        break;
                    }
                    Ok(n) => {
                        let data = &buf[..n];
                        debug!("Virtual radio {} received {} bytes: {:02X?}", radio.id(), n, data);

                        let replies = radio.process_bytes(data);
                        if !replies.is_empty() {
                            stream.write_all(&replies).await?;
                            stream.flush().await?;
                        }
                        publish(&mut radio, &event_tx);
                    }
                    Err(e) => {
                        warn!("Virtual radio {} stream error: {}", radio.id(), e);
                        return Err(e);
                    }
                }
            }

            // Handle commands from the channel
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualRadioCommand::Shutdown) => {
                        info!("Shutdown requested for virtual radio {}", radio.id());
                        break;
                    }
                    Some(cmd) => {
                        apply_command(&mut radio, cmd);
                        publish(&mut radio, &event_tx);
                    }
                    None => {
                        debug!("Command channel closed for virtual radio {}", radio.id());
                        break;
                    }
                }
            }

            // Polling loop
            _ = ticker.tick() => {
                radio.tick();
                publish(&mut radio, &event_tx);
            }
        }
    }

    info!("Virtual radio task ended for {}", radio.id());
    Ok(())
}

fn apply_command<S: PersistentStore>(radio: &mut VirtualRadio<S>, cmd: VirtualRadioCommand) {
    debug!("Virtual radio {} command: {:?}", radio.id(), cmd);
    match cmd {
        VirtualRadioCommand::SetPaddleLevel(level) => radio.board_mut().set_paddle_level(level),
        VirtualRadioCommand::SetPtt(pressed) => radio.board_mut().set_ptt(pressed),
        VirtualRadioCommand::Tune(steps) => radio.rig_mut().tune(steps),
        VirtualRadioCommand::SwitchBand(base_hz) => {
            if let Err(e) = radio.rig_mut().switch_band(base_hz) {
                warn!("Band switch to {} Hz refused: {}", base_hz, e);
            }
        }
        VirtualRadioCommand::EnableCw(enabled) => {
            if let Err(e) = radio.rig_mut().enable_cw(enabled) {
                warn!("CW switch refused: {}", e);
            }
        }
        VirtualRadioCommand::Shutdown => {}
    }
}

/// Broadcast everything the rig recorded; nobody listening is fine
fn publish<S: PersistentStore>(radio: &mut VirtualRadio<S>, event_tx: &broadcast::Sender<RigEvent>) {
    for event in radio.drain_events() {
        let _ = event_tx.send(event);
    }
}
