//! # saplay
//!
//! Looping multi-slot sound player.
//!
//! **Purpose:** Open one or more sound files, decode them, and stream the
//! decoded PCM asynchronously to an audio output service. Every configured
//! slot loops forever: when a file has been played and drained, the
//! scheduler restarts it on the next tick.
//!
//! **Architecture:** A single-threaded event loop dispatches transport
//! events, interrupts and a periodic tick to the [`playback::Player`],
//! which owns the connection, the scheduler and its playback streams.
//! Decoding uses symphonia; output goes through cpal via a lock-free ring.

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod logging;
pub mod playback;
pub mod transport;

pub use error::{Error, Result};
