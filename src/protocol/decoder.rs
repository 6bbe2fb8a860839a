//! # Frame Decoder
//!
//! Receiver-side view of the command stream: splits raw bytes into frames the
//! way the vehicle firmware does.
//!
//! ## Algorithm
//!
//! 1. Drop bytes until the buffer starts with a known prefix
//! 2. Wait until the fixed length for that prefix is buffered
//! 3. If a payload byte is itself a prefix, the frame was cut short: drop
//!    everything before that byte and resynchronise there
//! 4. Otherwise consume the frame

use bytes::{Buf, BytesMut};
use tracing::debug;

use super::frame::*;
use crate::config::ProtocolConfig;

/// A decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Joystick position (`power` is `None` for 3-byte frames)
    Joystick { x: u8, y: u8, power: Option<u8> },
    /// Button transition
    Button { button: ButtonId, state: ButtonState },
    /// Link probe
    Probe,
}

/// Incremental stream decoder
#[derive(Debug)]
pub struct FrameDecoder {
    protocol: ProtocolConfig,
    buffer: BytesMut,
    discarded: usize,
}

impl FrameDecoder {
    #[must_use]
    pub fn new(protocol: ProtocolConfig) -> Self {
        Self {
            protocol,
            buffer: BytesMut::with_capacity(64),
            discarded: 0,
        }
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of bytes dropped while resynchronising
    #[must_use]
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Bytes buffered but not yet part of a complete frame
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Decode every complete frame currently buffered
    ///
    /// # Examples
    ///
    /// ```
    /// use zerg_pad::config::ProtocolConfig;
    /// use zerg_pad::protocol::decoder::{Frame, FrameDecoder};
    /// use zerg_pad::protocol::frame::{ButtonId, ButtonState};
    ///
    /// let mut decoder = FrameDecoder::new(ProtocolConfig::default());
    /// decoder.push(&[0xF0, 0x01, 0x7F, 0xF1, 200]);
    /// assert_eq!(
    ///     decoder.drain(),
    ///     vec![Frame::Button { button: ButtonId::A, state: ButtonState::Pressed }]
    /// );
    /// assert_eq!(decoder.pending(), 2);
    /// ```
    pub fn drain(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Decode the next complete frame, if any
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            self.skip_to_prefix();

            let prefix = *self.buffer.first()?;
            let len = self.frame_len(prefix);
            if self.buffer.len() < len {
                return None;
            }

            if let Some(offset) = self.buffer[1..len].iter().position(|b| self.is_prefix(*b)) {
                debug!("Truncated frame 0x{:02X}, resynchronising", prefix);
                self.discard(offset + 1);
                continue;
            }

            let frame = self.buffer.split_to(len);
            match self.parse(&frame) {
                Some(decoded) => return Some(decoded),
                None => {
                    debug!("Dropping malformed frame {:02X?}", &frame[..]);
                    self.discarded += len;
                }
            }
        }
    }

    fn parse(&self, frame: &[u8]) -> Option<Frame> {
        let prefix = frame[0];
        if prefix == self.protocol.joystick_prefix {
            Some(Frame::Joystick {
                x: frame[1],
                y: frame[2],
                power: frame.get(3).copied(),
            })
        } else if prefix == self.protocol.button_prefix {
            Some(Frame::Button {
                button: ButtonId::from_code(frame[1])?,
                state: ButtonState::from_code(frame[2])?,
            })
        } else {
            Some(Frame::Probe)
        }
    }

    fn skip_to_prefix(&mut self) {
        let skip = self
            .buffer
            .iter()
            .position(|b| self.is_prefix(*b))
            .unwrap_or(self.buffer.len());
        self.discard(skip);
    }

    fn discard(&mut self, count: usize) {
        if count > 0 {
            self.buffer.advance(count);
            self.discarded += count;
        }
    }

    fn is_prefix(&self, byte: u8) -> bool {
        byte == self.protocol.joystick_prefix
            || byte == self.protocol.button_prefix
            || byte == self.protocol.probe_prefix
    }

    fn frame_len(&self, prefix: u8) -> usize {
        if prefix == self.protocol.joystick_prefix {
            self.protocol.joystick_frame_len()
        } else if prefix == self.protocol.button_prefix {
            BUTTON_FRAME_LEN
        } else {
            PROBE_FRAME_LEN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encoder::PacketEncoder;

    #[test]
    fn test_decode_joystick_frame() {
        let mut decoder = FrameDecoder::new(ProtocolConfig::default());
        decoder.push(&[0xF1, 253, 127, 100]);
        assert_eq!(
            decoder.next_frame(),
            Some(Frame::Joystick { x: 253, y: 127, power: Some(100) })
        );
        assert_eq!(decoder.next_frame(), None);
    }

    #[test]
    fn test_decode_three_byte_joystick_frame() {
        let protocol = ProtocolConfig {
            joystick_prefix: 0xFE,
            button_prefix: 0xFF,
            probe_prefix: 0xFD,
            include_power: false,
        };
        let mut decoder = FrameDecoder::new(protocol);
        decoder.push(&[0xFE, 10, 20, 0xFF, 0x02, 0x00]);
        assert_eq!(
            decoder.drain(),
            vec![
                Frame::Joystick { x: 10, y: 20, power: None },
                Frame::Button { button: ButtonId::B, state: ButtonState::Released },
            ]
        );
    }

    #[test]
    fn test_decode_split_across_pushes() {
        let mut decoder = FrameDecoder::new(ProtocolConfig::default());
        decoder.push(&[0xF1, 1]);
        assert_eq!(decoder.next_frame(), None);
        decoder.push(&[2, 3]);
        assert_eq!(
            decoder.next_frame(),
            Some(Frame::Joystick { x: 1, y: 2, power: Some(3) })
        );
    }

    #[test]
    fn test_leading_garbage_skipped() {
        let mut decoder = FrameDecoder::new(ProtocolConfig::default());
        decoder.push(&[0x00, 0x13, 0x37, 0xFE, 0x00, 0x00]);
        assert_eq!(decoder.drain(), vec![Frame::Probe]);
        assert_eq!(decoder.discarded(), 3);
    }

    #[test]
    fn test_truncated_frame_resynchronises() {
        let mut decoder = FrameDecoder::new(ProtocolConfig::default());
        // Joystick frame cut after x, followed by a full button frame
        decoder.push(&[0xF1, 0x40, 0xF0, 0x03, 0x7F]);
        assert_eq!(
            decoder.drain(),
            vec![Frame::Button { button: ButtonId::X, state: ButtonState::Pressed }]
        );
        assert_eq!(decoder.discarded(), 2);
    }

    #[test]
    fn test_unknown_button_id_dropped() {
        let mut decoder = FrameDecoder::new(ProtocolConfig::default());
        decoder.push(&[0xF0, 0x09, 0x7F, 0xF0, 0x08, 0x00]);
        assert_eq!(
            decoder.drain(),
            vec![Frame::Button { button: ButtonId::R, state: ButtonState::Released }]
        );
        assert_eq!(decoder.discarded(), 3);
    }

    #[test]
    fn test_encoder_output_decodes() {
        let encoder = PacketEncoder::default();
        let mut decoder = FrameDecoder::new(ProtocolConfig::default());
        let packets = [
            encoder.encode_joystick(127, 127, 0).unwrap(),
            encoder.encode_button(ButtonId::Start, ButtonState::Pressed).unwrap(),
            encoder.encode_joystick(30, 200, 77).unwrap(),
        ];
        for packet in &packets {
            decoder.push(packet.as_bytes());
        }
        assert_eq!(
            decoder.drain(),
            vec![
                Frame::Joystick { x: 127, y: 127, power: Some(0) },
                Frame::Button { button: ButtonId::Start, state: ButtonState::Pressed },
                Frame::Joystick { x: 30, y: 200, power: Some(77) },
            ]
        );
        assert_eq!(decoder.discarded(), 0);
        assert_eq!(decoder.pending(), 0);
    }
}
