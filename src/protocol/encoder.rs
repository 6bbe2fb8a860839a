//! # Packet Encoder
//!
//! Builds joystick, button and probe frames.
//!
//! A receiver finds frame boundaries by scanning for prefix bytes, so a
//! payload byte equal to any configured prefix would desynchronise it. The
//! encoder refuses such frames with [`ZergPadError::Encoding`] instead of
//! emitting them.

use super::frame::*;
use crate::config::ProtocolConfig;
use crate::error::{Result, ZergPadError};

/// Frame builder for one prefix configuration
#[derive(Debug, Clone, Copy)]
pub struct PacketEncoder {
    protocol: ProtocolConfig,
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self::new(ProtocolConfig::default())
    }
}

impl PacketEncoder {
    #[must_use]
    pub fn new(protocol: ProtocolConfig) -> Self {
        Self { protocol }
    }

    #[must_use]
    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    /// True if `byte` equals one of the configured prefixes
    #[must_use]
    pub fn is_prefix(&self, byte: u8) -> bool {
        byte == self.protocol.joystick_prefix
            || byte == self.protocol.button_prefix
            || byte == self.protocol.probe_prefix
    }

    /// Encode a joystick frame
    ///
    /// Produces `[prefix, x, y, power]`, or `[prefix, x, y]` when the
    /// protocol is configured without the power byte.
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if `x`, `y` or `power` equals a prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use zerg_pad::protocol::encoder::PacketEncoder;
    ///
    /// let encoder = PacketEncoder::default();
    /// let packet = encoder.encode_joystick(253, 127, 100)?;
    /// assert_eq!(packet.as_bytes(), &[0xF1, 253, 127, 100]);
    ///
    /// // 0xF0 is the button prefix and cannot appear as a coordinate
    /// assert!(encoder.encode_joystick(0xF0, 127, 100).is_err());
    /// # Ok::<(), zerg_pad::error::ZergPadError>(())
    /// ```
    pub fn encode_joystick(&self, x: u8, y: u8, power: u8) -> Result<Packet> {
        let mut frame = Vec::with_capacity(self.protocol.joystick_frame_len());
        frame.push(self.protocol.joystick_prefix);
        frame.push(x);
        frame.push(y);
        if self.protocol.include_power {
            frame.push(power);
        }

        self.finish(frame)
    }

    /// Encode a button frame `[prefix, id, state]`
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if the id or state byte equals a prefix. Config
    /// validation rules this out, so it only fires for an unvalidated
    /// [`ProtocolConfig`].
    pub fn encode_button(&self, button: ButtonId, state: ButtonState) -> Result<Packet> {
        let frame = vec![self.protocol.button_prefix, button.code(), state.code()];
        self.finish(frame)
    }

    /// Encode a link probe frame `[prefix, 0x00, 0x00]`
    pub fn encode_probe(&self) -> Result<Packet> {
        let frame = vec![self.protocol.probe_prefix, 0x00, 0x00];
        self.finish(frame)
    }

    fn finish(&self, frame: Vec<u8>) -> Result<Packet> {
        if let Some((offset, byte)) = frame
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, b)| self.is_prefix(**b))
        {
            return Err(ZergPadError::Encoding(format!(
                "payload byte {} (0x{:02X}) of frame 0x{:02X} collides with a prefix",
                offset, byte, frame[0]
            )));
        }

        Ok(Packet::from_vec(frame))
    }
}
