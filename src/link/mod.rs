//! # Radio Link Module
//!
//! Byte-stream transport to the vehicle (a serial-like radio link such as an
//! RFCOMM or HC-05 serial port).
//!
//! This module handles:
//! - The [`Link`] / [`Connector`] seams that the transmitter depends on
//! - A [`StreamLink`] over any async writer, and a serial [`SerialConnector`]
//! - Serialized send with retry, backoff and reconnect ([`transmitter`])
//! - Periodic liveness polling and the link-lost signal ([`monitor`], [`signal`])

pub mod signal;
pub mod transmitter;
pub mod monitor;

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{Result, ZergPadError};

/// An open byte stream to the vehicle
#[async_trait]
pub trait Link: Send {
    /// Write all data to the link
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Best-effort liveness check, polled by the connection monitor
    fn is_alive(&self) -> bool;

    /// Tear the stream down
    async fn close(&mut self) -> io::Result<()>;
}

/// Opens links by address
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Resolve `address` and establish a stream to it
    async fn connect(&self, address: &str) -> Result<Box<dyn Link>>;
}

/// [`Link`] over any async writer
///
/// The link reports itself dead after the first failed write, and, when it
/// was opened from a device node, as soon as that node disappears (RFCOMM
/// devices are removed when the remote end drops).
pub struct StreamLink<S> {
    stream: S,
    device_path: Option<PathBuf>,
    alive: bool,
}

impl<S> std::fmt::Debug for StreamLink<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamLink")
            .field("device_path", &self.device_path)
            .field("alive", &self.alive)
            .finish_non_exhaustive()
    }
}

impl<S> StreamLink<S>
where
    S: AsyncWrite + Unpin + Send,
{
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            device_path: None,
            alive: true,
        }
    }

    /// Link whose liveness also depends on `path` existing
    #[must_use]
    pub fn with_device_path(stream: S, path: impl Into<PathBuf>) -> Self {
        Self {
            stream,
            device_path: Some(path.into()),
            alive: true,
        }
    }

    fn track<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if result.is_err() {
            self.alive = false;
        }
        result
    }
}

#[async_trait]
impl<S> Link for StreamLink<S>
where
    S: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let result = self.stream.write_all(data).await;
        self.track(result)
    }

    async fn flush(&mut self) -> io::Result<()> {
        let result = self.stream.flush().await;
        self.track(result)
    }

    fn is_alive(&self) -> bool {
        self.alive
            && self
                .device_path
                .as_ref()
                .map_or(true, |path| path.exists())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.alive = false;
        self.stream.shutdown().await
    }
}

/// Opens the radio link as a serial port (8N1, no flow control)
#[derive(Debug, Clone)]
pub struct SerialConnector {
    baud_rate: u32,
}

impl SerialConnector {
    #[must_use]
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }
}

#[async_trait]
impl Connector for SerialConnector {
    async fn connect(&self, address: &str) -> Result<Box<dyn Link>> {
        use tokio_serial::SerialPortBuilderExt;

        debug!("Opening serial link {} at {} baud", address, self.baud_rate);

        let port = tokio_serial::new(address, self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| match e.kind {
                tokio_serial::ErrorKind::NoDevice => {
                    ZergPadError::TransportUnavailable(format!("{}: {}", address, e))
                }
                _ => ZergPadError::ConnectFailed {
                    address: address.to_string(),
                    reason: e.to_string(),
                },
            })?;

        Ok(Box::new(StreamLink::with_device_path(port, address)))
    }
}
