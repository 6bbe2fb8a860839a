//! # Coordinate Mapper Module
//!
//! Converts a polar joystick sample (angle, power) into an (x, y) byte pair
//! where 127 is the center of both axes.
//!
//! ## Formula
//!
//! ```text
//! magnitude = power * 126 / 100          // 100% -> 126, stays inside a byte
//! x = cx + round(cos(angle) * magnitude)  // cx - ... when invert_x is set
//! y = cy - round(sin(angle) * magnitude)  // screen up is physical forward
//! ```
//!
//! Both results are clamped to 0-255. Angles use the mapper convention
//! (0 = right, 90 = forward); UI angles are pre-rotated by the caller, see
//! [`rotate_ui_angle`](super::geometry::rotate_ui_angle).

use serde::Deserialize;

use crate::protocol::frame::{AXIS_CENTER, MAX_POWER_PERCENT};

/// Magnitude of a full-power deflection in coordinate units
pub const FULL_SCALE: f64 = 126.0;

/// A joystick position in byte coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub x: u8,
    pub y: u8,
}

impl Coordinate {
    /// Resting position of an uncalibrated stick
    pub const CENTER: Coordinate = Coordinate { x: AXIS_CENTER, y: AXIS_CENTER };

    #[must_use]
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Where the neutral position comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CenterMode {
    /// Always (127, 127)
    #[default]
    Fixed,
    /// Captured from the first sample inside the deadzone
    Calibrated,
}

/// Polar to byte-coordinate mapper
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    deadzone_percent: u8,
    invert_x: bool,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(15, false)
    }
}

impl CoordinateMapper {
    /// # Arguments
    ///
    /// * `deadzone_percent` - Power below this is treated as centered
    /// * `invert_x` - Swap left and right
    #[must_use]
    pub fn new(deadzone_percent: u8, invert_x: bool) -> Self {
        Self { deadzone_percent, invert_x }
    }

    #[must_use]
    pub fn deadzone_percent(&self) -> u8 {
        self.deadzone_percent
    }

    /// True if a sample with this power must be sent as the center position
    #[must_use]
    pub fn in_deadzone(&self, power: u8) -> bool {
        power < self.deadzone_percent
    }

    /// Map a sample to coordinates around `center`
    ///
    /// # Arguments
    ///
    /// * `angle` - Degrees, mapper convention (0 = right, 90 = forward)
    /// * `power` - Percent, values above 100 are treated as 100
    /// * `center` - Neutral position
    ///
    /// # Examples
    ///
    /// ```
    /// use zerg_pad::input::mapper::{Coordinate, CoordinateMapper};
    ///
    /// let mapper = CoordinateMapper::default();
    /// assert_eq!(mapper.to_xy(0, 100, Coordinate::CENTER), Coordinate::new(253, 127));
    /// assert_eq!(mapper.to_xy(90, 100, Coordinate::CENTER), Coordinate::new(127, 1));
    /// ```
    #[must_use]
    pub fn to_xy(&self, angle: u16, power: u8, center: Coordinate) -> Coordinate {
        let radians = f64::from(angle).to_radians();
        let magnitude = f64::from(power.min(MAX_POWER_PERCENT)) * FULL_SCALE / 100.0;

        let mut dx = (radians.cos() * magnitude).round() as i32;
        let dy = (-radians.sin() * magnitude).round() as i32;
        if self.invert_x {
            dx = -dx;
        }

        Coordinate {
            x: clamp_axis(i32::from(center.x) + dx),
            y: clamp_axis(i32::from(center.y) + dy),
        }
    }
}

#[inline]
fn clamp_axis(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
