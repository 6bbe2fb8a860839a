//! # Frame Constants and Types
//!
//! Core definitions for the pad's wire format.
//!
//! | Frame | Byte 0 | Byte 1 | Byte 2 | Byte 3 |
//! |-------|--------|--------|--------|--------|
//! | Joystick | prefix (0xF1) | x | y | power (optional) |
//! | Button | prefix (0xF0) | button id (1-8) | state (0x7F / 0x00) | |
//! | Probe | prefix (0xFE) | 0x00 | 0x00 | |

use bytes::Bytes;
use std::fmt;

/// Default joystick frame prefix
pub const DEFAULT_JOYSTICK_PREFIX: u8 = 0xF1;

/// Default button frame prefix
pub const DEFAULT_BUTTON_PREFIX: u8 = 0xF0;

/// Default link probe prefix
pub const DEFAULT_PROBE_PREFIX: u8 = 0xFE;

/// Button state byte for a pressed button
pub const STATE_PRESSED: u8 = 0x7F;

/// Button state byte for a released button
pub const STATE_RELEASED: u8 = 0x00;

/// Center of both axes in the byte coordinate space
pub const AXIS_CENTER: u8 = 127;

/// Largest power value (percent) carried by a joystick frame
pub const MAX_POWER_PERCENT: u8 = 100;

/// Button frame length (prefix + id + state)
pub const BUTTON_FRAME_LEN: usize = 3;

/// Probe frame length (prefix + two zero bytes)
pub const PROBE_FRAME_LEN: usize = 3;

/// Logical buttons of the pad.
///
/// The discriminant is the id byte sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ButtonId {
    A = 0x01,
    B = 0x02,
    X = 0x03,
    Y = 0x04,
    Select = 0x05,
    Start = 0x06,
    L = 0x07,
    R = 0x08,
}

impl ButtonId {
    /// All buttons in wire id order
    pub const ALL: [ButtonId; 8] = [
        ButtonId::A,
        ButtonId::B,
        ButtonId::X,
        ButtonId::Y,
        ButtonId::Select,
        ButtonId::Start,
        ButtonId::L,
        ButtonId::R,
    ];

    /// Wire id byte
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a button by its wire id
    ///
    /// # Examples
    ///
    /// ```
    /// use zerg_pad::protocol::frame::ButtonId;
    ///
    /// assert_eq!(ButtonId::from_code(0x05), Some(ButtonId::Select));
    /// assert_eq!(ButtonId::from_code(0x09), None);
    /// ```
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.code() == code)
    }

    /// Human-readable label
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ButtonId::A => "A",
            ButtonId::B => "B",
            ButtonId::X => "X",
            ButtonId::Y => "Y",
            ButtonId::Select => "SELECT",
            ButtonId::Start => "START",
            ButtonId::L => "L",
            ButtonId::R => "R",
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Press state of a button as carried by a button frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ButtonState {
    Pressed,
    #[default]
    Released,
}

impl ButtonState {
    #[must_use]
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed { ButtonState::Pressed } else { ButtonState::Released }
    }

    /// Wire state byte
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            ButtonState::Pressed => STATE_PRESSED,
            ButtonState::Released => STATE_RELEASED,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            STATE_PRESSED => Some(ButtonState::Pressed),
            STATE_RELEASED => Some(ButtonState::Released),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_pressed(self) -> bool {
        self == ButtonState::Pressed
    }
}

/// An encoded frame, ready to be written to the link.
///
/// Immutable and cheap to clone; only [`PacketEncoder`](super::encoder::PacketEncoder)
/// creates them.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Packet(Bytes);

impl Packet {
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        debug_assert!(!bytes.is_empty(), "packet without prefix");
        Self(Bytes::from(bytes))
    }

    /// Raw frame bytes, prefix included
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// First byte of the frame
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.0[0]
    }

    /// Frame length in bytes, prefix included: 3 or 4
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: every frame starts with its prefix byte
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Packet {
    /// Space separated upper-case hex, e.g. `F0 01 7F`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet[{}]", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(DEFAULT_JOYSTICK_PREFIX, 0xF1);
        assert_eq!(DEFAULT_BUTTON_PREFIX, 0xF0);
        assert_eq!(STATE_PRESSED, 0x7F);
        assert_eq!(STATE_RELEASED, 0x00);
        assert_eq!(AXIS_CENTER, 127);
    }

    #[test]
    fn test_button_codes_are_one_to_eight() {
        let codes: Vec<u8> = ButtonId::ALL.iter().map(|b| b.code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_button_from_code() {
        for button in ButtonId::ALL {
            assert_eq!(ButtonId::from_code(button.code()), Some(button));
        }
        assert_eq!(ButtonId::from_code(0), None);
        assert_eq!(ButtonId::from_code(0xF0), None);
    }

    #[test]
    fn test_button_state_codes() {
        assert_eq!(ButtonState::from_pressed(true).code(), 0x7F);
        assert_eq!(ButtonState::from_pressed(false).code(), 0x00);
        assert_eq!(ButtonState::from_code(0x7F), Some(ButtonState::Pressed));
        assert_eq!(ButtonState::from_code(0x01), None);
        assert_eq!(ButtonState::default(), ButtonState::Released);
    }

    #[test]
    fn test_packet_hex_display() {
        let packet = Packet::from_vec(vec![0xF1, 0xFD, 0x7F, 0x64]);
        assert_eq!(packet.to_string(), "F1 FD 7F 64");
        assert_eq!(format!("{:?}", packet), "Packet[F1 FD 7F 64]");
        assert_eq!(packet.prefix(), 0xF1);
        assert_eq!(packet.len(), 4);
    }

    #[test]
    fn test_encoded_packets_never_empty() {
        let encoder = crate::protocol::encoder::PacketEncoder::default();
        let packets = [
            encoder.encode_joystick(127, 127, 0).unwrap(),
            encoder.encode_button(ButtonId::Start, ButtonState::Pressed).unwrap(),
            encoder.encode_probe().unwrap(),
        ];
        for packet in packets {
            assert!(!packet.is_empty());
            assert!(matches!(packet.len(), 3 | 4), "{:?}", packet);
        }
    }
}
