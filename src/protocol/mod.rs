//! # Wire Protocol Module
//!
//! Byte-level framing of the command stream sent to the vehicle.
//!
//! This module handles:
//! - Frame constants, button identifiers and button states
//! - Joystick, button and probe frame encoding with prefix-collision checks
//! - Receiver-side stream decoding (frame type by prefix, fixed length per type)
//!
//! There is no length byte and no checksum: a receiver resynchronises by
//! scanning for a prefix byte, so payload bytes must never equal a prefix.

pub mod frame;
pub mod encoder;
pub mod decoder;
