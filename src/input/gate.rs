//! # Change Gate Module
//!
//! Rate-limits joystick frames so continuous small jitter cannot saturate the
//! link.
//!
//! A frame passes when at least `min_interval` has elapsed since the last
//! send AND either axis moved by more than `threshold` units. The center
//! transition bypasses the gate (see [`InputController`](crate::control::InputController)),
//! but still records itself here so the next gated frame is measured from it.

use std::time::Duration;
use tokio::time::Instant;

use super::mapper::Coordinate;

/// Last joystick frame handed to the transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendState {
    /// Position and power of the last frame, `None` before the first send
    pub last: Option<(Coordinate, u8)>,
    /// When that frame was sent
    pub last_sent_at: Option<Instant>,
}

/// Interval and delta gate for joystick frames
#[derive(Debug, Clone)]
pub struct ChangeGate {
    min_interval: Duration,
    threshold: u8,
    state: SendState,
}

impl Default for ChangeGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), 5)
    }
}

impl ChangeGate {
    /// # Arguments
    ///
    /// * `min_interval` - Minimum spacing between two frames
    /// * `threshold` - Per-axis movement that must be exceeded
    #[must_use]
    pub fn new(min_interval: Duration, threshold: u8) -> Self {
        Self {
            min_interval,
            threshold,
            state: SendState::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &SendState {
        &self.state
    }

    /// Decide whether a filtered position should be sent now.
    ///
    /// Records the frame in [`SendState`] when it is accepted; a rejected
    /// frame leaves the state untouched.
    pub fn should_send(&mut self, position: Coordinate, power: u8, now: Instant) -> bool {
        let accepted = self.accepts(position, now);
        if accepted {
            self.record(position, power, now);
        }
        accepted
    }

    /// Same decision as [`should_send`](Self::should_send) without recording
    #[must_use]
    pub fn accepts(&self, position: Coordinate, now: Instant) -> bool {
        if !self.interval_elapsed(now) {
            return false;
        }

        match self.state.last {
            None => true,
            Some((last, _)) => {
                axis_delta(position.x, last.x) > self.threshold
                    || axis_delta(position.y, last.y) > self.threshold
            }
        }
    }

    /// True if `min_interval` has passed since the last recorded frame
    #[must_use]
    pub fn interval_elapsed(&self, now: Instant) -> bool {
        match self.state.last_sent_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.min_interval,
        }
    }

    /// True if the last recorded frame is exactly this one
    #[must_use]
    pub fn is_last_sent(&self, position: Coordinate, power: u8) -> bool {
        self.state.last == Some((position, power))
    }

    /// Record a frame sent outside the gate
    pub fn record(&mut self, position: Coordinate, power: u8, now: Instant) {
        self.state.last = Some((position, power));
        self.state.last_sent_at = Some(now);
    }
}

#[inline]
fn axis_delta(a: u8, b: u8) -> u8 {
    a.abs_diff(b)
}
