//! pBitx Transceiver Simulator
//!
//! Runs the pBitx control core on a simulated board and serves CI-V on a
//! serial port, or on stdin/stdout when no port is given. Logs go to
//! stderr so they never mix with CI-V bytes.

mod settings;
mod stdio;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pbitx_control::RigEvent;
use pbitx_sim::{run_virtual_radio_task, JsonFileStore, VirtualRadio, VirtualRadioCommand};
use serialport::SerialPortType;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::Settings;
use stdio::StdioStream;

/// Simulated pBitx transceiver answering CI-V
#[derive(Parser)]
#[command(name = "pbitx", version, about)]
struct Cli {
    /// Serial port to serve CI-V on (e.g. /dev/ttyUSB0, COM3).
    /// Uses stdin/stdout when omitted.
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// JSON file holding the rig's persistent settings.
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Polling-loop period in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// CI-V address the rig answers to, in hex (e.g. A1 or 0xA1).
    #[arg(long, value_parser = parse_hex_u8)]
    civ_addr: Option<u8>,

    /// List serial ports and exit.
    #[arg(long)]
    list_ports: bool,

    /// Write the effective settings back to the settings file.
    #[arg(long)]
    save_settings: bool,
}

/// Parse a hex string like "A1" or "0xA1" into a u8.
fn parse_hex_u8(s: &str) -> std::result::Result<u8, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(s, 16).map_err(|e| format!("invalid hex byte: {e}"))
}

impl Cli {
    /// Command-line flags override the settings file
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(port) = &self.port {
            settings.port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(path) = &self.state_file {
            settings.state_file = Some(path.clone());
        }
        if let Some(tick_ms) = self.tick_ms {
            settings.radio.tick_interval_ms = tick_ms;
        }
        if let Some(addr) = self.civ_addr {
            settings.radio.rig.rig_address = addr;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pbitx=info,pbitx_protocol=info,pbitx_control=info,pbitx_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if cli.list_ports {
        return list_ports();
    }

    let mut settings = Settings::load();
    cli.apply_to(&mut settings);
    if cli.save_settings {
        let path = settings.save()?;
        info!("Saved settings to {}", path.display());
    }

    let state_path = settings.state_path();
    info!("Using rig state {}", state_path.display());
    let radio = VirtualRadio::new(settings.radio.clone(), JsonFileStore::open_or_empty(state_path));

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = broadcast::channel(256);
    tokio::spawn(log_events(event_rx));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cmd_tx.send(VirtualRadioCommand::Shutdown).await;
        }
    });

    match &settings.port {
        Some(port) => {
            info!("Serving CI-V on {} at {} baud", port, settings.baud_rate);
            let stream = tokio_serial::new(port, settings.baud_rate)
                .timeout(Duration::from_millis(100))
                .open_native_async()
                .with_context(|| format!("Failed to open {}", port))?;
            run_virtual_radio_task(stream, radio, cmd_rx, event_tx).await?;
        }
        None => {
            info!("Serving CI-V on stdin/stdout");
            run_virtual_radio_task(StdioStream::new(), radio, cmd_rx, event_tx).await?;
        }
    }

    Ok(())
}

fn list_ports() -> Result<()> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        match port.port_type {
            SerialPortType::UsbPort(usb) => println!(
                "{}  USB {:04X}:{:04X} {}",
                port.port_name,
                usb.vid,
                usb.pid,
                usb.product.unwrap_or_default()
            ),
            _ => println!("{}", port.port_name),
        }
    }
    Ok(())
}

/// Log what the rig does; the log is the simulator's front panel
async fn log_events(mut event_rx: broadcast::Receiver<RigEvent>) {
    loop {
        match event_rx.recv().await {
            Ok(RigEvent::FrequencyApplied {
                frequency_hz,
                mode,
                band,
                ..
            }) => debug!("Tuned {} Hz {} ({:?})", frequency_hz, mode, band),
            Ok(RigEvent::TransmitChanged {
                transmitting,
                trigger,
            }) => info!(
                "{} ({:?})",
                if transmitting { "TX" } else { "RX" },
                trigger
            ),
            Ok(RigEvent::VfoChanged(vfo)) => info!("VFO {}", vfo),
            Ok(RigEvent::SplitChanged(enabled)) => info!("Split {}", if enabled { "on" } else { "off" }),
            Ok(RigEvent::RitChanged(enabled)) => info!("RIT {}", if enabled { "on" } else { "off" }),
            Ok(RigEvent::KeyerModeChanged(mode)) => info!("Keyer {:?}", mode),
            Ok(event) => tracing::trace!("{:?}", event),
            Err(RecvError::Lagged(n)) => warn!("Event log skipped {} events", n),
            Err(RecvError::Closed) => break,
        }
    }
}
