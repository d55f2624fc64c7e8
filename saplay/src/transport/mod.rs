//! Playback transport
//!
//! The transport is the external playback service: it accepts a session,
//! creates named output streams with a fixed sample spec, buffers the bytes
//! pushed to them, and reports everything that happens asynchronously as
//! [`TransportEvent`]s posted to the event loop.
//!
//! Calls on [`Transport`] only *request* work. Their outcome arrives later
//! as an event, never as a nested callback, so every handler in the player
//! runs to completion before the next one starts.

pub mod cpal_backend;
pub mod ring;

use crate::error::Result;
use saplay_common::{ChannelMap, SampleSpec, Volume};
use std::fmt;

pub use cpal_backend::CpalTransport;

/// Transport-assigned identity of one output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamHandle(pub u64);

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Session states reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authorizing,
    SettingName,
    Ready,
    Failed,
    Terminated,
}

/// Stream states reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Creating,
    Ready,
    Failed,
    Terminated,
}

/// Something the transport wants the player to know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    ConnectionState(ConnectionState),
    StreamState {
        stream: StreamHandle,
        state: StreamState,
    },
    /// The stream can accept at least `length` more bytes
    WriteReady { stream: StreamHandle, length: usize },
    /// A requested drain finished
    DrainComplete { stream: StreamHandle, success: bool },
}

/// Parameters of a new output stream
#[derive(Debug, Clone)]
pub struct StreamRequest<'a> {
    pub name: &'a str,
    pub spec: SampleSpec,
    pub channel_map: Option<&'a ChannelMap>,
    pub volume: Volume,
    /// Sink to play on; `None` selects the default
    pub device: Option<&'a str>,
}

/// Client side of a playback service session
pub trait Transport {
    /// Start connecting. Progress arrives as `ConnectionState` events.
    fn connect(&mut self, server: Option<&str>, client_name: &str) -> Result<()>;

    /// Create an output stream. Requires a ready session.
    fn create_stream(&mut self, request: &StreamRequest<'_>) -> Result<StreamHandle>;

    /// Queue bytes in the stream's sample format. Returns bytes accepted.
    fn write(&mut self, stream: StreamHandle, data: &[u8]) -> Result<usize>;

    /// Ask for buffered audio to be played out; a `DrainComplete` follows.
    fn drain(&mut self, stream: StreamHandle) -> Result<()>;

    /// Release a stream. A `Terminated` stream event follows.
    fn disconnect_stream(&mut self, stream: StreamHandle) -> Result<()>;

    /// Close the session. A `Terminated` connection event follows.
    fn disconnect(&mut self);

    /// Text of the most recent transport error
    fn last_error(&self) -> Option<String>;
}
