//! # Stick Geometry Module
//!
//! Converts a stick deflection into the polar sample the rest of the
//! pipeline consumes, and classifies samples into eight directions.
//!
//! ## Angle conventions
//!
//! - **UI angle**: what the on-screen stick reports,
//!   `(atan2(-dy, dx) + 450) mod 360`. Screen right is 90, screen up is 180.
//! - **Mapper angle**: UI angle rotated by -90 degrees ([`rotate_ui_angle`]).
//!   Right is 0, forward (stick up) is 90.

use std::fmt;

/// One reading of the analog stick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoystickSample {
    /// Degrees, 0-359
    pub angle: u16,
    /// Percent of full deflection, 0-100
    pub power: u8,
}

impl JoystickSample {
    #[must_use]
    pub fn new(angle: u16, power: u8) -> Self {
        Self { angle: angle % 360, power: power.min(100) }
    }

    /// A released stick
    #[must_use]
    pub fn released() -> Self {
        Self::default()
    }
}

/// Build a UI sample from a deflection relative to the stick center.
///
/// `dy` grows downwards (screen and evdev convention). Deflections beyond
/// `radius` are clamped to the circle.
///
/// # Examples
///
/// ```
/// use zerg_pad::input::geometry::sample_from_deflection;
///
/// let up = sample_from_deflection(0.0, -50.0, 100.0);
/// assert_eq!((up.angle, up.power), (180, 50));
///
/// let rest = sample_from_deflection(0.0, 0.0, 100.0);
/// assert_eq!((rest.angle, rest.power), (0, 0));
/// ```
#[must_use]
pub fn sample_from_deflection(dx: f64, dy: f64, radius: f64) -> JoystickSample {
    if radius <= 0.0 || (dx == 0.0 && dy == 0.0) {
        return JoystickSample::released();
    }

    let distance = dx.hypot(dy).min(radius);
    let power = ((distance / radius) * 100.0).min(100.0) as u8;

    let degrees = (-dy).atan2(dx).to_degrees();
    let angle = ((degrees + 450.0) % 360.0) as u16 % 360;

    JoystickSample { angle, power }
}

/// Build a UI sample from raw absolute axis readings in `[min, max]`
#[must_use]
pub fn sample_from_axes(x: i32, y: i32, min: i32, max: i32) -> JoystickSample {
    let center = (f64::from(min) + f64::from(max)) / 2.0;
    let radius = (f64::from(max) - f64::from(min)) / 2.0;
    sample_from_deflection(f64::from(x) - center, f64::from(y) - center, radius)
}

/// Rotate a UI angle by -90 degrees into the mapper convention
///
/// # Examples
///
/// ```
/// use zerg_pad::input::geometry::rotate_ui_angle;
///
/// assert_eq!(rotate_ui_angle(90), 0);   // screen right
/// assert_eq!(rotate_ui_angle(180), 90); // screen up, forward
/// assert_eq!(rotate_ui_angle(0), 270);
/// ```
#[must_use]
pub fn rotate_ui_angle(angle: u16) -> u16 {
    (angle % 360 + 270) % 360
}

/// Coarse stick direction, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Center,
    Right,
    ForwardRight,
    Forward,
    ForwardLeft,
    Left,
    BackLeft,
    Back,
    BackRight,
}

impl Direction {
    /// Classify a mapper-convention angle into one of eight 45-degree sectors
    #[must_use]
    pub fn classify(angle: u16, power: u8) -> Self {
        if power == 0 {
            return Direction::Center;
        }

        match ((angle % 360 + 22) / 45) % 8 {
            0 => Direction::Right,
            1 => Direction::ForwardRight,
            2 => Direction::Forward,
            3 => Direction::ForwardLeft,
            4 => Direction::Left,
            5 => Direction::BackLeft,
            6 => Direction::Back,
            _ => Direction::BackRight,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::Center => "center",
            Direction::Right => "right",
            Direction::ForwardRight => "forward-right",
            Direction::Forward => "forward",
            Direction::ForwardLeft => "forward-left",
            Direction::Left => "left",
            Direction::BackLeft => "back-left",
            Direction::Back => "back",
            Direction::BackRight => "back-right",
        };
        f.write_str(label)
    }
}
