//! # Input Pipeline Module
//!
//! Turns joystick gestures and button presses into the values that go on the
//! wire.
//!
//! This module handles:
//! - Stick deflection to (angle, power) samples and 8-way direction
//! - Polar to byte-coordinate mapping with deadzone and calibrated center
//! - Per-axis low-pass filtering
//! - Rate limiting and change detection of outgoing joystick frames
//! - Per-button transition tracking

pub mod geometry;
pub mod mapper;
pub mod filter;
pub mod gate;
pub mod buttons;
