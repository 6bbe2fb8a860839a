//! # Gamepad Device
//!
//! Opens a gamepad through the Linux evdev interface.
//!
//! With no configured path, `/dev/input/event*` is scanned in name order
//! and the first device that reports both `ABS_X` and `ABS_Y` and at least
//! one face button is used.

use evdev::{AbsoluteAxisType, Device, InputEvent, Key};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, ZergPadError};

const INPUT_DIR: &str = "/dev/input";

/// An open gamepad
pub struct Gamepad {
    device: Device,
    device_path: String,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .field("name", &self.device.name())
            .finish()
    }
}

impl Gamepad {
    /// Open the configured device, or discover one when `path` is empty
    ///
    /// # Errors
    ///
    /// - `Controller` if the configured device cannot be opened or has no stick
    /// - `ControllerNotFound` if discovery finds no usable device
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use zerg_pad::gamepad::device::Gamepad;
    ///
    /// let gamepad = Gamepad::open("")?;
    /// println!("Using gamepad at {}", gamepad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Self::discover();
        }

        let device = Device::open(path)
            .map_err(|e| ZergPadError::Controller(format!("Failed to open {}: {}", path, e)))?;

        if !has_stick(&device) {
            return Err(ZergPadError::Controller(format!(
                "{} does not report ABS_X/ABS_Y",
                path
            )));
        }

        info!("Using gamepad {} ({})", path, device.name().unwrap_or("unnamed"));
        Ok(Self {
            device,
            device_path: path.to_string(),
        })
    }

    /// Scan `/dev/input` for the first usable gamepad
    pub fn discover() -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);
        if !input_dir.exists() {
            return Err(ZergPadError::Controller(format!("{} not found", INPUT_DIR)));
        }

        let mut paths: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| ZergPadError::Controller(format!("Failed to read {}: {}", INPUT_DIR, e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map_or(false, |name| name.to_string_lossy().starts_with("event"))
            })
            .collect();
        paths.sort();

        for path in paths {
            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );
                    if has_stick(&device) && has_face_buttons(&device) {
                        let device_path = path.to_string_lossy().to_string();
                        info!(
                            "Found gamepad {} at {}",
                            device.name().unwrap_or("unnamed"),
                            device_path
                        );
                        return Ok(Self { device, device_path });
                    }
                }
                Err(e) => {
                    // Usually permission denied
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(ZergPadError::ControllerNotFound)
    }

    #[must_use]
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Block until events are available and return them
    ///
    /// # Errors
    ///
    /// Returns `Controller` when the read fails, e.g. the pad was unplugged.
    pub fn fetch_events(&mut self) -> Result<impl Iterator<Item = InputEvent> + '_> {
        self.device
            .fetch_events()
            .map_err(|e| ZergPadError::Controller(format!("Failed to fetch events: {}", e)))
    }
}

fn has_stick(device: &Device) -> bool {
    device.supported_absolute_axes().map_or(false, |axes| {
        axes.contains(AbsoluteAxisType::ABS_X) && axes.contains(AbsoluteAxisType::ABS_Y)
    })
}

fn has_face_buttons(device: &Device) -> bool {
    device
        .supported_keys()
        .map_or(false, |keys| keys.contains(Key::BTN_SOUTH) || keys.contains(Key::BTN_EAST))
}
