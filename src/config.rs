//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every deployment variant of the pad (prefix pair, deadzone, axis inversion,
//! frame length, fixed or calibrated center) is a set of values in this file
//! rather than a separate code path.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, ZergPadError};
use crate::input::mapper::CenterMode;
use crate::protocol::frame::{ButtonId, ButtonState, MAX_POWER_PERCENT};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub joystick: JoystickConfig,
    #[serde(default)]
    pub gamepad: GamepadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Radio link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    #[serde(default)]
    pub probe_count: u32,

    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

/// Wire protocol configuration
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    #[serde(default = "default_joystick_prefix")]
    pub joystick_prefix: u8,

    #[serde(default = "default_button_prefix")]
    pub button_prefix: u8,

    #[serde(default = "default_probe_prefix")]
    pub probe_prefix: u8,

    #[serde(default = "default_include_power")]
    pub include_power: bool,
}

/// Joystick pipeline configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JoystickConfig {
    #[serde(default = "default_deadzone_percent")]
    pub deadzone_percent: u8,

    #[serde(default = "default_min_update_interval_ms")]
    pub min_update_interval_ms: u64,

    #[serde(default = "default_filter_alpha")]
    pub filter_alpha: f32,

    #[serde(default = "default_change_threshold")]
    pub change_threshold: u8,

    #[serde(default)]
    pub invert_x: bool,

    #[serde(default)]
    pub center_mode: CenterMode,

    #[serde(default)]
    pub avoid_prefix_collisions: bool,
}

/// Gamepad (evdev) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GamepadConfig {
    #[serde(default)]
    pub device_path: String,

    #[serde(default)]
    pub axis_min: i32,

    #[serde(default = "default_axis_max")]
    pub axis_max: i32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file_dir: String,
}

// Default value functions
fn default_address() -> String { "/dev/rfcomm0".to_string() }
fn default_baud_rate() -> u32 { 9600 }
fn default_max_retries() -> u32 { 2 }
fn default_retry_backoff_ms() -> u64 { 15 }
fn default_monitor_interval_ms() -> u64 { 2000 }
fn default_probe_interval_ms() -> u64 { 100 }

fn default_joystick_prefix() -> u8 { 0xF1 }
fn default_button_prefix() -> u8 { 0xF0 }
fn default_probe_prefix() -> u8 { 0xFE }
fn default_include_power() -> bool { true }

fn default_deadzone_percent() -> u8 { 15 }
fn default_min_update_interval_ms() -> u64 { 50 }
fn default_filter_alpha() -> f32 { 0.25 }
fn default_change_threshold() -> u8 { 5 }

fn default_axis_max() -> i32 { 255 }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            baud_rate: default_baud_rate(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            monitor_interval_ms: default_monitor_interval_ms(),
            probe_count: 0,
            probe_interval_ms: default_probe_interval_ms(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            joystick_prefix: default_joystick_prefix(),
            button_prefix: default_button_prefix(),
            probe_prefix: default_probe_prefix(),
            include_power: default_include_power(),
        }
    }
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            deadzone_percent: default_deadzone_percent(),
            min_update_interval_ms: default_min_update_interval_ms(),
            filter_alpha: default_filter_alpha(),
            change_threshold: default_change_threshold(),
            invert_x: false,
            center_mode: CenterMode::default(),
            avoid_prefix_collisions: false,
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            axis_min: 0,
            axis_max: default_axis_max(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> ZergPadError {
    ZergPadError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use zerg_pad::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Link
        if self.link.address.trim().is_empty() {
            return Err(invalid("link address cannot be empty"));
        }

        if ![9600, 19200, 38400, 57600, 115200].contains(&self.link.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200"));
        }

        if self.link.max_retries > 10 {
            return Err(invalid("max_retries must be between 0 and 10"));
        }

        if self.link.retry_backoff_ms == 0 || self.link.retry_backoff_ms > 1000 {
            return Err(invalid("retry_backoff_ms must be between 1 and 1000"));
        }

        if self.link.monitor_interval_ms < 100 || self.link.monitor_interval_ms > 60000 {
            return Err(invalid("monitor_interval_ms must be between 100 and 60000"));
        }

        if self.link.probe_count > 10 {
            return Err(invalid("probe_count must be between 0 and 10"));
        }

        if self.link.probe_interval_ms > 10000 {
            return Err(invalid("probe_interval_ms must be at most 10000"));
        }

        self.protocol.validate()?;

        // Joystick
        if self.joystick.deadzone_percent > 50 {
            return Err(invalid("deadzone_percent must be between 0 and 50"));
        }

        if self.joystick.min_update_interval_ms > 1000 {
            return Err(invalid("min_update_interval_ms must be between 0 and 1000"));
        }

        if !(self.joystick.filter_alpha > 0.0 && self.joystick.filter_alpha <= 1.0) {
            return Err(invalid("filter_alpha must be in (0.0, 1.0]"));
        }

        if self.joystick.change_threshold > 127 {
            return Err(invalid("change_threshold must be between 0 and 127"));
        }

        // Gamepad
        if self.gamepad.axis_min >= self.gamepad.axis_max {
            return Err(invalid("axis_min must be less than axis_max"));
        }

        Ok(())
    }
}

impl ProtocolConfig {
    /// Check that no prefix can be mistaken for another prefix or for a
    /// payload byte whose range is fixed by the protocol.
    pub fn validate(&self) -> Result<()> {
        let prefixes = [
            ("joystick_prefix", self.joystick_prefix),
            ("button_prefix", self.button_prefix),
            ("probe_prefix", self.probe_prefix),
        ];

        for (i, (name, value)) in prefixes.iter().enumerate() {
            for (other_name, other) in &prefixes[i + 1..] {
                if value == other {
                    return Err(invalid(format!(
                        "{} and {} must differ (both 0x{:02X})",
                        name, other_name, value
                    )));
                }
            }

            if *value <= MAX_POWER_PERCENT {
                return Err(invalid(format!(
                    "{} 0x{:02X} collides with the power range 0-{}",
                    name, value, MAX_POWER_PERCENT
                )));
            }

            if ButtonId::from_code(*value).is_some() {
                return Err(invalid(format!("{} 0x{:02X} collides with a button id", name, value)));
            }

            if *value == ButtonState::Pressed.code() || *value == ButtonState::Released.code() {
                return Err(invalid(format!("{} 0x{:02X} collides with a button state", name, value)));
            }
        }

        Ok(())
    }

    /// Joystick frame length in bytes (prefix included)
    #[must_use]
    pub fn joystick_frame_len(&self) -> usize {
        if self.include_power { 4 } else { 3 }
    }
}
