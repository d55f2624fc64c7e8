//! # saplay Common Library
//!
//! Shared code for the saplay workspace including:
//! - Audio value types (sample format, sample spec, volume, channel map)
//! - TOML configuration schema and config file discovery
//! - Common error type

pub mod config;
pub mod error;
pub mod format;

pub use error::{Error, Result};
pub use format::{ChannelMap, ChannelPosition, SampleFormat, SampleSpec, Volume};
