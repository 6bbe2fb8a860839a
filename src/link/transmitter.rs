//! # Transmitter
//!
//! Single owner of the live radio link. Every write goes through
//! [`Transmitter::send`], which holds one async mutex across write, flush,
//! the retry loop and any reconnect, so frames never interleave on the wire
//! and a send racing a reconnect waits for the new handle.
//!
//! ## Send algorithm
//!
//! 1. If there is no handle (a previous reconnect failed), reconnect first
//! 2. Write + flush; on failure retry up to `max_retries` times, sleeping
//!    `retry_backoff * attempt` before each retry
//! 3. If every attempt failed: raise the link-lost signal, reconnect once
//!    and return [`ZergPadError::SendFailed`]. The packet is not replayed;
//!    joystick state is superseded by the next sample anyway.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::signal::LinkSignal;
use super::{Connector, Link};
use crate::config::LinkConfig;
use crate::error::{Result, ZergPadError};
use crate::protocol::encoder::PacketEncoder;
use crate::protocol::frame::Packet;

/// Capacity of the sent-packet diagnostic channel
const PACKET_CHANNEL_CAPACITY: usize = 64;

/// Retry, reconnect and probe parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitterOptions {
    /// Last known device address, reused on every reconnect
    pub address: String,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub probe_count: u32,
    pub probe_interval: Duration,
}

impl Default for TransmitterOptions {
    fn default() -> Self {
        Self::from(&LinkConfig::default())
    }
}

impl From<&LinkConfig> for TransmitterOptions {
    fn from(config: &LinkConfig) -> Self {
        Self {
            address: config.address.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            probe_count: config.probe_count,
            probe_interval: Duration::from_millis(config.probe_interval_ms),
        }
    }
}

/// Snapshot of transmitter counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransmitterStats {
    pub packets_sent: u64,
    /// Sends that failed on every attempt
    pub send_failures: u64,
    pub reconnects: u64,
}

/// Serialized sender with retry and reconnect
pub struct Transmitter {
    connector: Arc<dyn Connector>,
    options: TransmitterOptions,
    encoder: PacketEncoder,
    link: Mutex<Option<Box<dyn Link>>>,
    signal: LinkSignal,
    packets: broadcast::Sender<Packet>,
    packets_sent: AtomicU64,
    send_failures: AtomicU64,
    reconnects: AtomicU64,
}

impl std::fmt::Debug for Transmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transmitter")
            .field("options", &self.options)
            .field("link_state", &self.signal.current())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Transmitter {
    /// Open the link and send the configured probes
    ///
    /// # Arguments
    ///
    /// * `connector` - Opens links by address
    /// * `options` - Address, retry and probe settings
    /// * `encoder` - Used to build probe frames
    /// * `signal` - Raised when the link is lost, cleared on (re)connect
    ///
    /// # Errors
    ///
    /// Returns the connector's error (`ConnectFailed` or
    /// `TransportUnavailable`). A failed startup connect is terminal; the
    /// signal is raised before returning.
    pub async fn connect(
        connector: Arc<dyn Connector>,
        options: TransmitterOptions,
        encoder: PacketEncoder,
        signal: LinkSignal,
    ) -> Result<Self> {
        let (packets, _) = broadcast::channel(PACKET_CHANNEL_CAPACITY);

        let transmitter = Self {
            connector,
            options,
            encoder,
            link: Mutex::new(None),
            signal,
            packets,
            packets_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        };

        let link = transmitter.open().await.map_err(|e| {
            transmitter.signal.raise_lost();
            e
        })?;
        *transmitter.link.lock().await = Some(link);
        transmitter.signal.clear();

        info!("Connected to {}", transmitter.options.address);
        Ok(transmitter)
    }

    /// Send one packet
    ///
    /// # Errors
    ///
    /// - `SendFailed` if every write attempt failed (a reconnect has been tried)
    /// - `TransportUnavailable` / `ConnectFailed` if there was no handle and
    ///   the reconnect made to obtain one failed
    pub async fn send(&self, packet: &Packet) -> Result<()> {
        let mut slot = self.link.lock().await;

        let mut reconnected = false;
        if slot.is_none() {
            reconnected = true;
            if let Err(e) = self.reconnect_locked(&mut slot).await {
                self.send_failures.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        }

        let mut last_error = String::from("link closed");
        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let delay = self.options.retry_backoff * attempt;
                warn!(
                    "Send of [{}] failed ({}), retry {}/{} in {:?}",
                    packet, last_error, attempt, self.options.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }

            let Some(link) = slot.as_deref_mut() else {
                break;
            };

            match write_packet(link, packet).await {
                Ok(()) => {
                    self.packets_sent.fetch_add(1, Ordering::Relaxed);
                    debug!("Sent [{}]", packet);
                    // No receivers is fine
                    let _ = self.packets.send(packet.clone());
                    return Ok(());
                }
                Err(e) => last_error = e.to_string(),
            }
        }

        self.send_failures.fetch_add(1, Ordering::Relaxed);
        self.signal.raise_lost();

        if !reconnected {
            // Failure is already logged and signalled; the next send retries
            let _ = self.reconnect_locked(&mut slot).await;
        }

        Err(ZergPadError::SendFailed {
            attempts: self.options.max_retries + 1,
            reason: last_error,
        })
    }

    /// Close the current handle and open a new one at the stored address
    ///
    /// # Errors
    ///
    /// Returns the connector's error; the handle slot is left empty and the
    /// link-lost signal raised.
    pub async fn reconnect(&self) -> Result<()> {
        let mut slot = self.link.lock().await;
        self.reconnect_locked(&mut slot).await
    }

    async fn reconnect_locked(&self, slot: &mut Option<Box<dyn Link>>) -> Result<()> {
        if let Some(mut old) = slot.take() {
            if let Err(e) = old.close().await {
                debug!("Error closing old link: {}", e);
            }
        }

        self.reconnects.fetch_add(1, Ordering::Relaxed);
        info!("Reconnecting to {}", self.options.address);

        match self.open().await {
            Ok(link) => {
                *slot = Some(link);
                self.signal.clear();
                info!("Reconnected to {}", self.options.address);
                Ok(())
            }
            Err(e) => {
                warn!("Reconnect to {} failed: {}", self.options.address, e);
                self.signal.raise_lost();
                Err(e)
            }
        }
    }

    async fn open(&self) -> Result<Box<dyn Link>> {
        let mut link = self.connector.connect(&self.options.address).await?;
        self.probe(link.as_mut()).await?;
        Ok(link)
    }

    /// Write the probe frames to a freshly opened link. A write failure here
    /// is only logged; the first real send will find out.
    async fn probe(&self, link: &mut dyn Link) -> Result<()> {
        if self.options.probe_count == 0 {
            return Ok(());
        }

        let probe = self.encoder.encode_probe()?;
        for i in 0..self.options.probe_count {
            if i > 0 {
                tokio::time::sleep(self.options.probe_interval).await;
            }
            if let Err(e) = write_packet(link, &probe).await {
                warn!("Probe {} of {} failed: {}", i + 1, self.options.probe_count, e);
                break;
            }
            debug!("Probe [{}]", probe);
        }
        Ok(())
    }

    /// Liveness as seen by the connection monitor.
    ///
    /// Does not wait for a send in progress: while the handle is busy the
    /// current link signal is reported instead.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        match self.link.try_lock() {
            Ok(slot) => slot.as_ref().map_or(false, |link| link.is_alive()),
            Err(_) => !self.signal.is_lost(),
        }
    }

    /// Close the link. Later sends will reconnect.
    pub async fn close(&self) {
        if let Some(mut link) = self.link.lock().await.take() {
            match link.close().await {
                Ok(()) => info!("Link to {} closed", self.options.address),
                Err(e) => warn!("Error closing link: {}", e),
            }
        }
    }

    /// Every successfully sent packet, for diagnostic display
    #[must_use]
    pub fn subscribe_packets(&self) -> broadcast::Receiver<Packet> {
        self.packets.subscribe()
    }

    #[must_use]
    pub fn signal(&self) -> &LinkSignal {
        &self.signal
    }

    #[must_use]
    pub fn options(&self) -> &TransmitterOptions {
        &self.options
    }

    #[must_use]
    pub fn encoder(&self) -> &PacketEncoder {
        &self.encoder
    }

    #[must_use]
    pub fn stats(&self) -> TransmitterStats {
        TransmitterStats {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

async fn write_packet(link: &mut dyn Link, packet: &Packet) -> std::io::Result<()> {
    link.write_all(packet.as_bytes()).await?;
    link.flush().await
}
