//! # Gamepad Module
//!
//! Physical gamepad input for the command-line client.
//!
//! This module handles:
//! - Finding an evdev device with an analog stick and opening it
//! - Translating raw evdev events into [`ControlEvent`](crate::control::ControlEvent)s

pub mod device;
pub mod events;
