//! # Zerg Pad Library
//!
//! Drive a remote robot from a gamepad over a serial radio link.
//!
//! Stick samples and button edges are turned into a compact binary command
//! stream (`[0xF1, x, y, power]` joystick frames, `[0xF0, id, state]` button
//! frames) and written to the link with bounded retry and reconnect.

pub mod config;
pub mod control;
pub mod error;
pub mod gamepad;
pub mod input;
pub mod link;
pub mod protocol;
