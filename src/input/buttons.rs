//! # Button Table Module
//!
//! Tracks the last state sent for each button so that a command goes out
//! only on a press/release edge. Overlapping touch or key-repeat events that
//! report the same state twice are swallowed here.

use std::collections::HashMap;

use crate::protocol::frame::{ButtonId, ButtonState};

/// Last-sent state per button; unknown buttons count as released
#[derive(Debug, Clone, Default)]
pub struct ButtonTable {
    states: HashMap<ButtonId, ButtonState>,
}

impl ButtonTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last state sent for `button`
    #[must_use]
    pub fn state(&self, button: ButtonId) -> ButtonState {
        self.states.get(&button).copied().unwrap_or_default()
    }

    /// Apply an input event.
    ///
    /// Returns the new state if it differs from the last one sent, `None` for
    /// a duplicate.
    ///
    /// # Examples
    ///
    /// ```
    /// use zerg_pad::input::buttons::ButtonTable;
    /// use zerg_pad::protocol::frame::{ButtonId, ButtonState};
    ///
    /// let mut table = ButtonTable::new();
    /// assert_eq!(table.transition(ButtonId::A, true), Some(ButtonState::Pressed));
    /// assert_eq!(table.transition(ButtonId::A, true), None);
    /// assert_eq!(table.transition(ButtonId::A, false), Some(ButtonState::Released));
    /// ```
    pub fn transition(&mut self, button: ButtonId, pressed: bool) -> Option<ButtonState> {
        let next = ButtonState::from_pressed(pressed);
        if self.state(button) == next {
            return None;
        }
        self.states.insert(button, next);
        Some(next)
    }

    /// Buttons whose last sent state is pressed
    pub fn pressed(&self) -> impl Iterator<Item = ButtonId> + '_ {
        self.states
            .iter()
            .filter(|(_, state)| state.is_pressed())
            .map(|(button, _)| *button)
    }
}
