//! # Gamepad Event Translation
//!
//! Folds raw evdev events into [`ControlEvent`]s.
//!
//! Stick axes are latched as they arrive and emitted as one joystick
//! sample per `SYN_REPORT`, so an X and Y change in the same report
//! produce a single sample. Buttons are emitted immediately.
//!
//! | evdev key    | Button |
//! |--------------|--------|
//! | `BTN_SOUTH`  | A      |
//! | `BTN_EAST`   | B      |
//! | `BTN_WEST`   | X      |
//! | `BTN_NORTH`  | Y      |
//! | `BTN_SELECT` | SELECT |
//! | `BTN_START`  | START  |
//! | `BTN_TL`     | L      |
//! | `BTN_TR`     | R      |
//!
//! Pressing `BTN_MODE` (home) requests a stick recalibration.

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key, Synchronization};

use crate::config::GamepadConfig;
use crate::control::ControlEvent;
use crate::input::geometry::sample_from_axes;
use crate::protocol::frame::ButtonId;

/// Button bound to an evdev key, if any
#[must_use]
pub fn button_for_key(key: Key) -> Option<ButtonId> {
    match key {
        Key::BTN_SOUTH => Some(ButtonId::A),
        Key::BTN_EAST => Some(ButtonId::B),
        Key::BTN_WEST => Some(ButtonId::X),
        Key::BTN_NORTH => Some(ButtonId::Y),
        Key::BTN_SELECT => Some(ButtonId::Select),
        Key::BTN_START => Some(ButtonId::Start),
        Key::BTN_TL => Some(ButtonId::L),
        Key::BTN_TR => Some(ButtonId::R),
        _ => None,
    }
}

/// Stateful evdev to [`ControlEvent`] translator
///
/// Not thread-safe; use from the reader thread only.
#[derive(Debug, Clone)]
pub struct GamepadMapper {
    axis_min: i32,
    axis_max: i32,
    x: i32,
    y: i32,
    stick_dirty: bool,
}

impl Default for GamepadMapper {
    fn default() -> Self {
        Self::new(0, 255)
    }
}

impl GamepadMapper {
    /// Mapper for sticks reporting values in `[axis_min, axis_max]`
    #[must_use]
    pub fn new(axis_min: i32, axis_max: i32) -> Self {
        let rest = (axis_min + axis_max) / 2;
        Self {
            axis_min,
            axis_max,
            x: rest,
            y: rest,
            stick_dirty: false,
        }
    }

    #[must_use]
    pub fn from_config(config: &GamepadConfig) -> Self {
        Self::new(config.axis_min, config.axis_max)
    }

    /// Latest raw stick position
    #[must_use]
    pub fn stick(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Feed one evdev event
    ///
    /// # Examples
    ///
    /// ```
    /// use evdev::{EventType, InputEvent, Key};
    /// use zerg_pad::control::ControlEvent;
    /// use zerg_pad::gamepad::events::GamepadMapper;
    /// use zerg_pad::protocol::frame::ButtonId;
    ///
    /// let mut mapper = GamepadMapper::default();
    /// let press = InputEvent::new(EventType::KEY, Key::BTN_SOUTH.code(), 1);
    /// assert_eq!(
    ///     mapper.process_event(&press),
    ///     Some(ControlEvent::Button { button: ButtonId::A, pressed: true })
    /// );
    /// ```
    pub fn process_event(&mut self, event: &InputEvent) -> Option<ControlEvent> {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => {
                self.process_axis_event(axis, event.value());
                None
            }
            InputEventKind::Key(Key::BTN_MODE) if event.value() == 1 => Some(ControlEvent::Recalibrate),
            InputEventKind::Key(key) => button_for_key(key).map(|button| ControlEvent::Button {
                button,
                // 2 is autorepeat, still held
                pressed: event.value() != 0,
            }),
            InputEventKind::Synchronization(Synchronization::SYN_REPORT) if self.stick_dirty => {
                self.stick_dirty = false;
                Some(ControlEvent::Joystick(sample_from_axes(
                    self.x,
                    self.y,
                    self.axis_min,
                    self.axis_max,
                )))
            }
            _ => None,
        }
    }

    fn process_axis_event(&mut self, axis: AbsoluteAxisType, value: i32) {
        match axis {
            AbsoluteAxisType::ABS_X => {
                self.x = value;
                self.stick_dirty = true;
            }
            AbsoluteAxisType::ABS_Y => {
                self.y = value;
                self.stick_dirty = true;
            }
            _ => {
                // Right stick, triggers and d-pad are not used
            }
        }
    }
}
