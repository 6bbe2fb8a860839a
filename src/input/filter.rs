//! # Low-Pass Filter
//!
//! Exponential smoothing of a single axis:
//!
//! `last = alpha * raw + (1 - alpha) * last`
//!
//! The output is `round(last)` clamped to the byte range. Each axis owns its
//! own filter.

use crate::protocol::frame::AXIS_CENTER;

/// Single-channel exponential smoothing filter
#[derive(Debug, Clone, Copy)]
pub struct LowPassFilter {
    alpha: f32,
    last_value: f32,
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self::new(0.25)
    }
}

impl LowPassFilter {
    /// Creates a filter resting at the axis center.
    ///
    /// `alpha` is clamped to `(0.0, 1.0]`; 1.0 disables smoothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use zerg_pad::input::filter::LowPassFilter;
    ///
    /// let mut filter = LowPassFilter::new(0.25);
    /// // Warm-up: the first sample is pulled towards the resting center 127
    /// assert_eq!(filter.filter(253), 159);
    /// ```
    #[must_use]
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(f32::EPSILON, 1.0),
            last_value: AXIS_CENTER as f32,
        }
    }

    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Feed one raw sample and return the smoothed value
    pub fn filter(&mut self, raw: i32) -> u8 {
        self.last_value = self.alpha * raw as f32 + (1.0 - self.alpha) * self.last_value;
        self.last_value.round().clamp(0.0, 255.0) as u8
    }

    /// Force the internal state, so the next output does not glide from a stale position
    pub fn reset(&mut self, value: u8) {
        self.last_value = value as f32;
    }
}
