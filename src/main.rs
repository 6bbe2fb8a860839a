//! # Zerg Pad
//!
//! Drive a remote robot from a gamepad over a serial radio link.
//!
//! The binary opens the gamepad and the radio link, then forwards every
//! stick movement and button edge through the input pipeline until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use zerg_pad::config::{Config, LoggingConfig};
use zerg_pad::control::{coalesce_events, ControlEvent, InputController};
use zerg_pad::error::ZergPadError;
use zerg_pad::gamepad::device::Gamepad;
use zerg_pad::gamepad::events::GamepadMapper;
use zerg_pad::link::monitor::ConnectionMonitor;
use zerg_pad::link::signal::LinkSignal;
use zerg_pad::link::transmitter::{Transmitter, TransmitterOptions};
use zerg_pad::link::SerialConnector;
use zerg_pad::protocol::encoder::PacketEncoder;
use zerg_pad::protocol::frame::Packet;

/// Number of packets between status log messages
const LOG_INTERVAL_PACKETS: u64 = 500;

/// Gamepad events buffered between the reader thread and the send loop
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shortest period of the held-stick resample timer
const MIN_RESAMPLE_PERIOD_MS: u64 = 10;

/// How long shutdown waits for the neutral frames
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Radio link device, overrides `link.address`
    #[arg(short, long)]
    address: Option<String>,
}

/// Main entry point
///
/// # Control Flow
///
/// 1. Load configuration, initialise logging
/// 2. Open the gamepad, connect the radio link (a failed connect is fatal)
/// 3. Start the connection monitor and the gamepad reader thread
/// 4. Forward events to the [`InputController`], resampling the held stick
///    every `min_update_interval_ms`, until Ctrl+C or the pad disappears
/// 5. Release buttons, recenter the stick, stop the monitor, close the link
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_found = args.config.exists();
    let mut config = if config_found {
        Config::load(&args.config)
            .with_context(|| format!("Failed to load {}", args.config.display()))?
    } else {
        Config::default()
    };
    if let Some(address) = args.address {
        config.link.address = address;
        config.validate()?;
    }

    let _log_guard = init_logging(&config.logging);

    info!("Zerg Pad v{} starting...", env!("CARGO_PKG_VERSION"));
    if !config_found {
        warn!("{} not found, using built-in defaults", args.config.display());
    }

    let gamepad = Gamepad::open(&config.gamepad.device_path)?;
    let mapper = GamepadMapper::from_config(&config.gamepad);

    let transmitter = Transmitter::connect(
        Arc::new(SerialConnector::new(config.link.baud_rate)),
        TransmitterOptions::from(&config.link),
        PacketEncoder::new(config.protocol),
        LinkSignal::new(),
    )
    .await
    .with_context(|| format!("Failed to connect to {}", config.link.address))?;
    let transmitter = Arc::new(transmitter);

    let monitor = ConnectionMonitor::new(
        Arc::clone(&transmitter),
        Duration::from_millis(config.link.monitor_interval_ms),
    )
    .spawn();

    let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    spawn_gamepad_reader(gamepad, mapper, events_tx)?;

    let mut controller = InputController::new(&config, Arc::clone(&transmitter));

    info!("Press Ctrl+C to exit");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut resample = tokio::time::interval(resample_period(config.joystick.min_update_interval_ms));
    resample.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut sent: u64 = 0;
    loop {
        let batch = tokio::select! {
            event = events_rx.recv() => {
                let Some(first) = event else {
                    warn!("Gamepad input ended, shutting down...");
                    break;
                };
                // Anything queued behind a slow send is stale by now
                let mut pending = vec![first];
                while let Ok(event) = events_rx.try_recv() {
                    pending.push(event);
                }
                coalesce_events(pending)
            }

            _ = resample.tick() => vec![ControlEvent::Resample],

            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        };

        let dispatch = async {
            for event in batch {
                let result = controller.handle(event).await;
                record_outcome(result, &transmitter, &mut sent);
            }
        };

        // A send stuck in backoff or reconnect must not hold up Ctrl+C
        tokio::select! {
            _ = dispatch => {}
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, controller.neutralize()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Could not send neutral commands: {}", e),
        Err(_) => warn!("Link did not take the neutral commands within {:?}", SHUTDOWN_TIMEOUT),
    }
    monitor.shutdown().await;
    transmitter.close().await;

    let stats = transmitter.stats();
    info!(
        "Total packets sent: {} ({} failed sends, {} reconnects)",
        stats.packets_sent, stats.send_failures, stats.reconnects
    );

    Ok(())
}

/// Held-stick resample period; `interval` rejects a zero period
fn resample_period(min_update_interval_ms: u64) -> Duration {
    Duration::from_millis(min_update_interval_ms.max(MIN_RESAMPLE_PERIOD_MS))
}

/// True when the running packet count has reached a status checkpoint
fn stats_due(sent: u64) -> bool {
    sent > 0 && sent % LOG_INTERVAL_PACKETS == 0
}

fn record_outcome(
    result: zerg_pad::error::Result<Option<Packet>>,
    transmitter: &Transmitter,
    sent: &mut u64,
) {
    match result {
        Ok(Some(_)) => {
            *sent += 1;
            if stats_due(*sent) {
                let stats = transmitter.stats();
                info!(
                    "Sent {} packets ({} failed sends, {} reconnects)",
                    stats.packets_sent, stats.send_failures, stats.reconnects
                );
            }
        }
        Ok(None) => {}
        // Already reported where it was detected
        Err(ZergPadError::Encoding(_)) => {}
        Err(e) => warn!("{}", e),
    }
}

/// Initialise `tracing`: stdout always, a daily rolling file when
/// `file_dir` is set. The returned guard must live until exit so buffered
/// file output is flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if config.file_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.file_dir, "zerg-pad.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}

/// Read the gamepad on its own OS thread. evdev reads block in the kernel,
/// so a plain thread keeps them off the runtime and does not hold up exit.
fn spawn_gamepad_reader(
    mut gamepad: Gamepad,
    mut mapper: GamepadMapper,
    events: mpsc::Sender<ControlEvent>,
) -> Result<()> {
    std::thread::Builder::new()
        .name("gamepad".to_string())
        .spawn(move || loop {
            let batch: Vec<ControlEvent> = match gamepad.fetch_events() {
                Ok(raw) => raw.filter_map(|event| mapper.process_event(&event)).collect(),
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };

            for event in batch {
                if events.blocking_send(event).is_err() {
                    // Send loop has exited
                    return;
                }
            }
        })
        .context("Failed to spawn gamepad reader thread")?;

    Ok(())
}
