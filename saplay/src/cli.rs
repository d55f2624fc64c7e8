//! Command-line interface

use clap::Parser;
use saplay_common::config::FailurePolicy;
use saplay_common::{ChannelMap, Volume};
use std::path::PathBuf;

/// Version line with build identification from build.rs
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ", ",
    env!("BUILD_PROFILE"),
    ")"
);

/// Command-line arguments for saplay
#[derive(Parser, Debug, Default)]
#[command(name = "saplay")]
#[command(about = "Play sound files in an endless loop, one output stream per file")]
#[command(version, long_version = LONG_VERSION)]
pub struct Cli {
    /// Sound files to play, one slot each
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Enable verbose operations (state transition tracing)
    #[arg(short, long)]
    pub verbose: bool,

    /// The name of the server to connect to
    #[arg(short, long, value_name = "SERVER")]
    pub server: Option<String>,

    /// The name of the sink/device to connect to
    #[arg(short, long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// How to call this client on the server
    #[arg(short = 'n', long, value_name = "NAME")]
    pub client_name: Option<String>,

    /// How to call this stream on the server
    #[arg(long, value_name = "NAME")]
    pub stream_name: Option<String>,

    /// Specify the initial (linear) volume in range 0...65536
    #[arg(long, value_name = "VOLUME", allow_negative_numbers = true)]
    pub volume: Option<Volume>,

    /// Set the channel map to use (standard name or comma-separated positions)
    #[arg(long, value_name = "CHANNELMAP")]
    pub channel_map: Option<ChannelMap>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// What a single failing stream does: stop its slot or end the process
    #[arg(long, value_name = "POLICY")]
    pub failure_policy: Option<FailurePolicy>,
}
