// FlipMouse Settings Module
// Optional TOML configuration with the built-in defaults of the daemon

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::input::SupportedDevice;
use crate::keymap::KeymapKind;

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// Complete daemon configuration.
///
/// Every section is optional in the file; missing values fall back to the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub pointer: PointerSettings,

    #[serde(default)]
    pub toggle: ToggleSettings,

    #[serde(default)]
    pub choreography: ChoreographySettings,

    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Devices the daemon attaches to, in order of preference
    #[serde(default = "default_devices")]
    pub devices: Vec<SupportedDevice>,

    /// Path the settings were loaded from, if any
    #[serde(skip)]
    source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    pub control_socket: PathBuf,
    pub status_file: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            control_socket: PathBuf::from("/data/local/tmp/flipmouse/sock"),
            status_file: PathBuf::from("/data/local/tmp/flipmouse/status"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointerSettings {
    pub initial_speed: i32,
    pub min_speed: i32,
    /// Emit one wheel step per this many wheel key events
    pub wheel_slowdown: u32,
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            initial_speed: 4,
            min_speed: 1,
            wheel_slowdown: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToggleSettings {
    pub hold_threshold_ms: u64,
    /// Releasing the toggle key after this long stops the daemon
    pub eject_hold_ms: Option<u64>,
}

impl ToggleSettings {
    pub fn hold_threshold(&self) -> Duration {
        Duration::from_millis(self.hold_threshold_ms)
    }

    pub fn eject_hold(&self) -> Option<Duration> {
        self.eject_hold_ms.map(Duration::from_millis)
    }
}

impl Default for ToggleSettings {
    fn default() -> Self {
        Self {
            hold_threshold_ms: 1000,
            eject_hold_ms: None,
        }
    }
}

/// Step sizes and offsets of the parking and centering walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChoreographySettings {
    pub park_step: i32,
    pub park_reps: u32,
    pub center_step: i32,
    pub center_left: i32,
    pub center_up: i32,
    pub settle_us: u64,
}

impl ChoreographySettings {
    pub fn settle(&self) -> Duration {
        Duration::from_micros(self.settle_us)
    }
}

impl Default for ChoreographySettings {
    fn default() -> Self {
        Self {
            park_step: 200,
            park_reps: 40,
            center_step: 20,
            center_left: 40,
            center_up: 60,
            settle_us: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchSettings {
    pub poll_timeout_ms: u64,
}

impl DispatchSettings {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 200,
        }
    }
}

fn default_devices() -> Vec<SupportedDevice> {
    vec![
        SupportedDevice::new("mtk-kpd", KeymapKind::Keypad),
        SupportedDevice::new("matrix-keypad", KeymapKind::Keypad),
        SupportedDevice::new("AT Translated Set 2 keyboard", KeymapKind::Laptop),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            pointer: PointerSettings::default(),
            toggle: ToggleSettings::default(),
            choreography: ChoreographySettings::default(),
            dispatch: DispatchSettings::default(),
            devices: default_devices(),
            source_path: None,
        }
    }
}

impl Settings {
    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Get the default settings path (~/.config/flipmouse/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("flipmouse").join("config.toml"))
    }

    /// Load an explicit file, or the default one when it exists.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::default())
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Reject values the daemon cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.pointer.min_speed < 1 {
            return Err(SettingsError::InvalidValue(format!(
                "pointer.min_speed must be at least 1, got {}",
                self.pointer.min_speed
            )));
        }
        if self.pointer.wheel_slowdown == 0 {
            return Err(SettingsError::InvalidValue(
                "pointer.wheel_slowdown must be at least 1".to_string(),
            ));
        }
        if self.choreography.center_step <= 0 {
            return Err(SettingsError::InvalidValue(format!(
                "choreography.center_step must be positive, got {}",
                self.choreography.center_step
            )));
        }
        if self.choreography.center_left < 0 || self.choreography.center_up < 0 {
            return Err(SettingsError::InvalidValue(
                "choreography offsets must not be negative".to_string(),
            ));
        }
        if self.devices.is_empty() {
            return Err(SettingsError::InvalidValue(
                "at least one [[devices]] entry is required".to_string(),
            ));
        }
        Ok(())
    }
}
