//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set. Otherwise `--verbose` turns on debug output
//! for the saplay crates and the config file's `[logging].level` applies.
//! Output goes to stderr, or is appended to `[logging].file`.

use crate::error::{Error, Result};
use saplay_common::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directives used when `RUST_LOG` is not set
///
/// # Errors
/// `InvalidArgument` if `level` is not a tracing level name.
pub fn filter_directives(verbose: bool, level: &str) -> Result<String> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        level
            .trim()
            .parse::<tracing::Level>()
            .map_err(|_| Error::InvalidArgument(format!("Unknown log level '{}'", level)))?
    };
    let level = level.as_str().to_ascii_lowercase();
    Ok(format!("warn,saplay={0},saplay_common={0}", level))
}

/// Install the global subscriber
///
/// # Errors
/// Bad log level, or the log file cannot be opened for appending.
pub fn init_logging(verbose: bool, config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directives(verbose, &config.level)?)
            .map_err(|e| Error::InvalidArgument(e.to_string()))?,
    };

    let (writer, ansi) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::InvalidArgument(format!(
                        "Cannot open log file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(verbose),
        )
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_from_config_level() {
        assert_eq!(
            filter_directives(false, "info").unwrap(),
            "warn,saplay=info,saplay_common=info"
        );
        assert_eq!(
            filter_directives(false, " TRACE ").unwrap(),
            "warn,saplay=trace,saplay_common=trace"
        );
    }

    #[test]
    fn test_verbose_overrides_config_level() {
        assert_eq!(
            filter_directives(true, "error").unwrap(),
            "warn,saplay=debug,saplay_common=debug"
        );
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert!(matches!(
            filter_directives(false, "chatty"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
