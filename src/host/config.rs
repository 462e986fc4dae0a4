// Configuration for the room secrets overlay

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::core::constants::{
    DEFAULT_ANCHOR_STAGE, DEFAULT_CELL_SIZE, DEFAULT_DEBOUNCE_TICKS, DEFAULT_GRID_ORIGIN_X,
    DEFAULT_GRID_ORIGIN_Z, DEFAULT_INTERACT_RADIUS, DEFAULT_LOAD_TIMEOUT,
    DEFAULT_MESSAGE_CAPACITY, DEFAULT_PICKUP_RADIUS, DEFAULT_POST_CONNECT_DELAY,
    DEFAULT_SERVER_HOST_PATTERN, DEFAULT_TASK_TIMEOUT,
};
use crate::core::grid::GridSettings;
use crate::core::room_detector::DetectorSettings;
use crate::core::secrets::TrackerSettings;

// =============================================================================
// CONFIGURATION STRUCTURES
// =============================================================================

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingSettings {
    /// Also log to stdout
    #[serde(default)]
    pub console: bool,
    /// Log file path (relative to the config file or absolute). Empty = no file logging.
    #[serde(default)]
    pub log_file: String,
}

/// Room detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    #[serde(default = "default_cell_size")]
    pub cell_size: i32,
    #[serde(default = "default_grid_origin_x")]
    pub grid_origin_x: i32,
    #[serde(default = "default_grid_origin_z")]
    pub grid_origin_z: i32,
    /// Consecutive ticks before a room change is confirmed
    #[serde(default = "default_debounce_ticks")]
    pub debounce_ticks: u32,
}

fn default_cell_size() -> i32 {
    DEFAULT_CELL_SIZE
}
fn default_grid_origin_x() -> i32 {
    DEFAULT_GRID_ORIGIN_X
}
fn default_grid_origin_z() -> i32 {
    DEFAULT_GRID_ORIGIN_Z
}
fn default_debounce_ticks() -> u32 {
    DEFAULT_DEBOUNCE_TICKS
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            grid_origin_x: default_grid_origin_x(),
            grid_origin_z: default_grid_origin_z(),
            debounce_ticks: default_debounce_ticks(),
        }
    }
}

/// Secret matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretSettings {
    /// Max distance (blocks) between a picked up item and its secret
    #[serde(default = "default_pickup_radius")]
    pub pickup_radius: f64,
    /// Max distance (blocks) between a clicked block and a chest/essence
    #[serde(default = "default_interact_radius")]
    pub interact_radius: f64,
    #[serde(default)]
    pub practice_mode: bool,
}

fn default_pickup_radius() -> f64 {
    DEFAULT_PICKUP_RADIUS
}
fn default_interact_radius() -> f64 {
    DEFAULT_INTERACT_RADIUS
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            pickup_radius: default_pickup_radius(),
            interact_radius: default_interact_radius(),
            practice_mode: false,
        }
    }
}

/// Where the room catalog comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Catalog file. Empty = the catalog bundled in the binary.
    #[serde(default)]
    pub path: String,
    /// Upper bound for `block_till_load` in seconds (0 = wait indefinitely)
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,
}

fn default_load_timeout_secs() -> u64 {
    DEFAULT_LOAD_TIMEOUT.as_secs()
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            load_timeout_secs: default_load_timeout_secs(),
        }
    }
}

/// Packet observation and background task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Server address fragment that enables packet observation
    #[serde(default = "default_server_host_pattern")]
    pub server_host_pattern: String,
    /// Pipeline stage the observer is inserted before
    #[serde(default = "default_anchor_stage")]
    pub anchor_stage: String,
    /// Delay between the player becoming available and the post-connect hook
    #[serde(default = "default_post_connect_delay_ms")]
    pub post_connect_delay_ms: u64,
    /// Upper bound for any background task in seconds
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
}

fn default_server_host_pattern() -> String {
    DEFAULT_SERVER_HOST_PATTERN.to_string()
}
fn default_anchor_stage() -> String {
    DEFAULT_ANCHOR_STAGE.to_string()
}
fn default_post_connect_delay_ms() -> u64 {
    DEFAULT_POST_CONNECT_DELAY.as_millis() as u64
}
fn default_task_timeout_secs() -> u64 {
    DEFAULT_TASK_TIMEOUT.as_secs()
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            server_host_pattern: default_server_host_pattern(),
            anchor_stage: default_anchor_stage(),
            post_connect_delay_ms: default_post_connect_delay_ms(),
            task_timeout_secs: default_task_timeout_secs(),
        }
    }
}

/// User notification queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSettings {
    /// Max queued notifications before the oldest is dropped (0 = unbounded)
    #[serde(default = "default_message_capacity")]
    pub capacity: usize,
}

fn default_message_capacity() -> usize {
    DEFAULT_MESSAGE_CAPACITY
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            capacity: default_message_capacity(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub detection: DetectionSettings,
    #[serde(default)]
    pub secrets: SecretSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub messages: MessageSettings,
}

// =============================================================================
// CONFIG LOADING
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

impl Config {
    pub const CONFIG_FILENAME: &'static str = "room_secrets.toml";

    /// Load configuration from a TOML file. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "[CONFIG] Looking for config");

        if !path.exists() {
            debug!("[CONFIG] No config found, using defaults");
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), "[CONFIG] Loaded config");
        Ok(config)
    }

    /// Load `room_secrets.toml` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        Self::load(&dir.join(Self::CONFIG_FILENAME))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the detector and tracker cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.cell_size <= 0 {
            return Err(ConfigError::InvalidValue(format!(
                "detection.cell_size must be positive, got {}",
                self.detection.cell_size
            )));
        }
        for (name, radius) in [
            ("secrets.pickup_radius", self.secrets.pickup_radius),
            ("secrets.interact_radius", self.secrets.interact_radius),
        ] {
            if !radius.is_finite() || radius < 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be a non-negative number, got {radius}"
                )));
            }
        }
        Ok(())
    }

    pub fn grid_settings(&self) -> GridSettings {
        GridSettings {
            cell_size: self.detection.cell_size,
            origin_x: self.detection.grid_origin_x,
            origin_z: self.detection.grid_origin_z,
        }
    }

    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            grid: self.grid_settings(),
            debounce_ticks: self.detection.debounce_ticks,
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            pickup_radius: self.secrets.pickup_radius,
            interact_radius: self.secrets.interact_radius,
            practice_mode: self.secrets.practice_mode,
        }
    }

    /// Catalog file, resolved against `base_dir`. None = bundled catalog.
    pub fn catalog_path(&self, base_dir: &Path) -> Option<PathBuf> {
        resolve_path(&self.catalog.path, base_dir)
    }

    /// Log file, resolved against `base_dir`. None = no file logging.
    pub fn log_file_path(&self, base_dir: &Path) -> Option<PathBuf> {
        resolve_path(&self.logging.log_file, base_dir)
    }

    /// Catalog wait bound. None = wait indefinitely.
    pub fn load_timeout(&self) -> Option<Duration> {
        match self.catalog.load_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.network.task_timeout_secs)
    }

    pub fn post_connect_delay(&self) -> Duration {
        Duration::from_millis(self.network.post_connect_delay_ms)
    }

    /// Notification queue bound. None = unbounded.
    pub fn message_capacity(&self) -> Option<usize> {
        match self.messages.capacity {
            0 => None,
            cap => Some(cap),
        }
    }
}

fn resolve_path(raw: &str, base_dir: &Path) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        Some(path)
    } else {
        Some(base_dir.join(path))
    }
}
