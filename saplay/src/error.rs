//! Error types for saplay
//!
//! Defines the player's error taxonomy using thiserror. Only
//! `ConnectionTerminated` maps to a clean exit; every other variant that
//! reaches the top level ends the process with exit code 1.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for saplay
#[derive(Error, Debug)]
pub enum Error {
    /// A sound file could not be opened or interpreted
    #[error("Failed to open file '{}': {reason}", .path.display())]
    OpenFailed { path: PathBuf, reason: String },

    /// A playback stream failed in the transport
    #[error("Stream error: {0}")]
    StreamFailed(String),

    /// The connection to the playback service failed
    #[error("Connection failure: {0}")]
    ConnectionFailed(String),

    /// The playback service closed the connection gracefully
    #[error("Connection terminated")]
    ConnectionTerminated,

    /// Bad command-line value, config value or channel map
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A state machine received an event it has no transition for
    #[error("Illegal {machine} transition: {event} while {state}")]
    IllegalTransition {
        machine: &'static str,
        state: String,
        event: String,
    },

    /// Operation requires a transport handle the stream does not hold
    #[error("No active stream: {0}")]
    NoActiveStream(String),

    /// Shared configuration and value-type errors
    #[error(transparent)]
    Common(#[from] saplay_common::Error),
}

impl Error {
    /// Process exit code for an error that ends the program
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ConnectionTerminated => 0,
            _ => 1,
        }
    }

    pub(crate) fn open_failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::OpenFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn illegal(
        machine: &'static str,
        state: impl std::fmt::Debug,
        event: impl std::fmt::Debug,
    ) -> Self {
        Error::IllegalTransition {
            machine,
            state: format!("{:?}", state),
            event: format!("{:?}", event),
        }
    }
}

/// Convenience Result type using saplay Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::ConnectionTerminated.exit_code(), 0);
        assert_eq!(Error::ConnectionFailed("refused".into()).exit_code(), 1);
        assert_eq!(Error::StreamFailed("underrun".into()).exit_code(), 1);
        assert_eq!(Error::InvalidArgument("--volume".into()).exit_code(), 1);
    }

    #[test]
    fn test_open_failed_message() {
        let err = Error::open_failed("/tmp/missing.wav", "No such file");
        assert_eq!(
            err.to_string(),
            "Failed to open file '/tmp/missing.wav': No such file"
        );
    }
}
