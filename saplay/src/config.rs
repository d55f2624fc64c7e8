//! Runtime settings for the player
//!
//! Merges the command line over the TOML file over built-in defaults and
//! produces one [`SlotConfig`] per playback slot.

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::playback::PlayerOptions;
use saplay_common::config::{load_config, FailurePolicy, LoggingConfig, SlotEntry, TomlConfig};
use saplay_common::{ChannelMap, Volume};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Files played when neither the command line nor the config names any
pub const DEFAULT_SLOT_PATHS: [&str; 2] = [
    "/usr/share/sounds/alsa/Front_Left.wav",
    "/usr/share/sounds/alsa/Front_Right.wav",
];

/// Default time allowed for streams to drain on interrupt
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(2000);

const FALLBACK_CLIENT_NAME: &str = "saplay";

/// Everything needed to (re)start one playback slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotConfig {
    pub path: PathBuf,
    /// Explicit stream name; `None` uses the title tag or file name
    pub stream_name: Option<String>,
    pub volume: Volume,
    pub channel_map: Option<ChannelMap>,
    pub device: Option<String>,
}

impl SlotConfig {
    /// Slot for `path` with default volume and no overrides
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stream_name: None,
            volume: Volume::NORM,
            channel_map: None,
            device: None,
        }
    }
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: Option<String>,
    pub client_name: String,
    pub slots: Vec<SlotConfig>,
    pub failure_policy: FailurePolicy,
    pub shutdown_grace: Duration,
    pub verbose: bool,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load the config file the command line points at (or discovers) and
    /// resolve settings against it
    ///
    /// # Errors
    /// `Common` when a located config file cannot be read or parsed, plus
    /// everything [`Settings::resolve`] reports.
    pub fn load(cli: &Cli) -> Result<Self> {
        let toml = load_config(cli.config.as_deref())?;
        Self::resolve(cli, toml)
    }

    /// Resolve settings from the command line and the loaded TOML file
    ///
    /// # Errors
    /// `InvalidArgument` for a bad volume or channel map coming from the
    /// config file (command-line values are already validated by clap).
    pub fn resolve(cli: &Cli, toml: TomlConfig) -> Result<Self> {
        let argv0 = std::env::args_os().next();
        let client_name = cli
            .client_name
            .clone()
            .or_else(|| toml.client_name.clone())
            .unwrap_or_else(|| default_client_name(argv0.as_deref()));

        let global_map = parse_channel_map(toml.channel_map.as_deref())?;
        let global_volume = toml.volume.map(Volume::from_raw);

        let entries: Vec<SlotEntry> = if !cli.files.is_empty() {
            cli.files.iter().map(|path| bare_entry(path)).collect()
        } else if !toml.slots.is_empty() {
            toml.slots.clone()
        } else {
            DEFAULT_SLOT_PATHS
                .iter()
                .map(|path| bare_entry(Path::new(path)))
                .collect()
        };

        let mut slots = Vec::with_capacity(entries.len());
        for entry in entries {
            let slot_map = parse_channel_map(entry.channel_map.as_deref())?;
            slots.push(SlotConfig {
                stream_name: cli
                    .stream_name
                    .clone()
                    .or(entry.stream_name)
                    .or_else(|| toml.stream_name.clone()),
                volume: cli
                    .volume
                    .or(entry.volume.map(Volume::from_raw))
                    .or(global_volume)
                    .unwrap_or(Volume::NORM),
                channel_map: cli
                    .channel_map
                    .clone()
                    .or(slot_map)
                    .or_else(|| global_map.clone()),
                device: cli
                    .device
                    .clone()
                    .or(entry.device)
                    .or_else(|| toml.device.clone()),
                path: entry.path,
            });
        }

        Ok(Self {
            server: cli.server.clone().or(toml.server),
            client_name,
            slots,
            failure_policy: cli
                .failure_policy
                .or(toml.failure_policy)
                .unwrap_or_default(),
            shutdown_grace: toml
                .shutdown_grace_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SHUTDOWN_GRACE),
            verbose: cli.verbose,
            logging: toml.logging,
        })
    }

    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            failure_policy: self.failure_policy,
            shutdown_grace: self.shutdown_grace,
        }
    }
}

fn bare_entry(path: &Path) -> SlotEntry {
    SlotEntry {
        path: path.to_path_buf(),
        stream_name: None,
        volume: None,
        channel_map: None,
        device: None,
    }
}

fn parse_channel_map(spec: Option<&str>) -> Result<Option<ChannelMap>> {
    spec.map(|s| {
        s.parse::<ChannelMap>()
            .map_err(|e| Error::InvalidArgument(e.to_string()))
    })
    .transpose()
}

/// Client name derived from the executable's base name
pub fn default_client_name(argv0: Option<&OsStr>) -> String {
    argv0
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_CLIENT_NAME.to_string())
}
