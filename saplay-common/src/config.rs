//! TOML configuration schema and config file discovery
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments (applied by the binary)
//! 2. TOML configuration file
//! 3. Built-in defaults
//!
//! A missing config file is not an error: the player starts with defaults.
//! An explicitly requested file, however, must exist and parse.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SAPLAY_CONFIG";

/// Application directory name used below the platform config dir
const APP_DIR: &str = "saplay";

/// What to do when a single playback stream fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop only the failing slot; exit once every slot has failed
    #[default]
    Isolate,
    /// Any stream failure ends the process with exit code 1
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isolate" => Ok(FailurePolicy::Isolate),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(Error::InvalidInput(format!(
                "Unknown failure policy '{}' (expected isolate or abort)",
                other
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Isolate => write!(f, "isolate"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Configuration loaded from the TOML file
///
/// Every field is optional; unset values fall through to built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    /// Output host to connect to (e.g. "alsa", "jack")
    pub server: Option<String>,

    /// Output device (sink) name
    pub device: Option<String>,

    /// How this client identifies itself
    pub client_name: Option<String>,

    /// Stream name applied to every slot without its own name
    pub stream_name: Option<String>,

    /// Linear volume, 65536 = unity gain
    pub volume: Option<i64>,

    /// Channel map spec applied to every slot without its own map
    pub channel_map: Option<String>,

    pub failure_policy: Option<FailurePolicy>,

    /// How long shutdown waits for streams to drain
    pub shutdown_grace_ms: Option<u64>,

    /// Playback slots, one `[[slot]]` table each
    #[serde(rename = "slot")]
    pub slots: Vec<SlotEntry>,

    pub logging: LoggingConfig,
}

/// One `[[slot]]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub stream_name: Option<String>,
    #[serde(default)]
    pub volume: Option<i64>,
    #[serde(default)]
    pub channel_map: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&text)?;
        info!("Loaded TOML configuration from {}", path.display());
        Ok(config)
    }
}

/// Find the config file to use, if any
///
/// Search order:
/// 1. Explicit path (command line)
/// 2. `SAPLAY_CONFIG` environment variable
/// 3. `<user config dir>/saplay/config.toml`
/// 4. `/etc/saplay/config.toml` (unix only)
///
/// Explicit and environment paths are returned whether or not they exist,
/// so that the caller reports a missing file instead of silently ignoring it.
pub fn discover_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load the effective TOML configuration
///
/// Falls back to defaults when no file is found.
///
/// # Errors
/// Returns `Config` if a located file cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    match discover_config_file(explicit) {
        Some(path) => TomlConfig::load(&path),
        None => {
            debug!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}
