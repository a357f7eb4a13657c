//! Configuration loading and config file resolution
//!
//! Bootstrap configuration comes from a single TOML file. Every key has a
//! built-in default, so a missing file is never fatal.
//!
//! # Config File Resolution Priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MOODCAST_CONFIG`)
//! 3. Platform config directory (`<config_dir>/moodcast/config.toml`)
//! 4. None: compiled defaults are used

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MOODCAST_CONFIG";

/// Default toast display duration (milliseconds)
pub const DEFAULT_TOAST_DURATION_MS: u64 = 4000;
/// Default confirm button label
pub const DEFAULT_CONFIRM_LABEL: &str = "Confirm";
/// Default confirm button style tag
pub const DEFAULT_CONFIRM_STYLE: &str = "destructive";
/// Default confirmation modal heading
pub const DEFAULT_CONFIRM_HEADING: &str = "Are you sure?";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port for the rendering-surface service
    ///
    /// Default: 5730
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Broadcaster defaults (optional)
    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            logging: LoggingConfig::default(),
            notifications: NotificationSettings::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Broadcaster defaults
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationSettings {
    /// How long a toast stays visible before it expires
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,

    /// Confirm button label used when a request doesn't set one
    #[serde(default = "default_confirm_label")]
    pub confirm_label: String,

    /// Confirm button style tag used when a request doesn't set one
    #[serde(default = "default_confirm_style")]
    pub confirm_style: String,

    /// Modal heading used when a request doesn't set one
    #[serde(default = "default_confirm_heading")]
    pub confirm_heading: String,

    /// Event channel capacity (events buffered per subscriber)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            toast_duration_ms: default_toast_duration_ms(),
            confirm_label: default_confirm_label(),
            confirm_style: default_confirm_style(),
            confirm_heading: default_confirm_heading(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl NotificationSettings {
    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    /// Reject values the broadcaster cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::Config(
                "notifications.event_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_toast_duration_ms() -> u64 {
    DEFAULT_TOAST_DURATION_MS
}

fn default_confirm_label() -> String {
    DEFAULT_CONFIRM_LABEL.to_string()
}

fn default_confirm_style() -> String {
    DEFAULT_CONFIRM_STYLE.to_string()
}

fn default_confirm_heading() -> String {
    DEFAULT_CONFIRM_HEADING.to_string()
}

fn default_event_capacity() -> usize {
    100
}

/// Resolve which config file to read, if any
///
/// Returns `None` when no explicit path is given and the platform default
/// does not exist.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// Platform config file location (`~/.config/moodcast/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("moodcast").join("config.toml"))
}

/// Load configuration from a TOML file
///
/// A missing file logs a warning and yields defaults. A file that exists
/// but does not parse is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Config file not found at {}, using built-in defaults",
                path.display()
            );
            return Ok(TomlConfig::default());
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let config: TomlConfig = toml::from_str(&content)?;
    config.notifications.validate()?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve and load configuration in one step
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => load_toml_config(&path),
        None => {
            info!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}
