//! Scripted Transport for player tests
//!
//! Records every call. Without an event sender the test drives all server
//! events by hand. With one ([`MockTransport::auto`]) it answers like a
//! well-behaved server: the connection becomes ready, streams become ready
//! and keep asking for `write_chunk` bytes after every write, drains
//! complete, and releases are confirmed.

use saplay::event_loop::EventSender;
use saplay::transport::{
    ConnectionState, StreamHandle, StreamRequest, StreamState, Transport, TransportEvent,
};
use saplay::{Error, Result};
use saplay_common::{SampleSpec, Volume};

/// One recorded transport call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect {
        server: Option<String>,
        client_name: String,
    },
    CreateStream {
        handle: StreamHandle,
        name: String,
        spec: SampleSpec,
        volume: Volume,
        device: Option<String>,
        map_channels: Option<u8>,
    },
    Write {
        stream: StreamHandle,
        bytes: usize,
    },
    Drain(StreamHandle),
    DisconnectStream(StreamHandle),
    Disconnect,
}

pub struct MockTransport {
    pub calls: Vec<Call>,
    events: Option<EventSender>,
    /// Auto mode: report `Failed` instead of `Ready` on connect
    pub fail_connection: bool,
    /// Auto mode: report drains as unsuccessful
    pub fail_drain: bool,
    /// Refuse `create_stream` calls
    pub refuse_streams: bool,
    /// Auto mode: bytes requested per write request
    pub write_chunk: usize,
    pub error: Option<String>,
    next_handle: u64,
}

impl MockTransport {
    /// Transport whose events are injected by the test
    pub fn scripted() -> Self {
        Self {
            calls: Vec::new(),
            events: None,
            fail_connection: false,
            fail_drain: false,
            refuse_streams: false,
            write_chunk: 1024,
            error: None,
            next_handle: 1,
        }
    }

    /// Transport that posts server events into the loop on its own
    pub fn auto(events: EventSender) -> Self {
        Self {
            events: Some(events),
            ..Self::scripted()
        }
    }

    fn emit(&self, event: TransportEvent) {
        if let Some(events) = &self.events {
            events.transport(event);
        }
    }

    /// Handles of every stream created, in order
    pub fn created(&self) -> Vec<StreamHandle> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::CreateStream { handle, .. } => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::CreateStream { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Spec requested for a stream
    pub fn spec_of(&self, stream: StreamHandle) -> Option<SampleSpec> {
        self.calls.iter().find_map(|c| match c {
            Call::CreateStream { handle, spec, .. } if *handle == stream => Some(*spec),
            _ => None,
        })
    }

    pub fn bytes_written(&self, stream: StreamHandle) -> usize {
        self.calls
            .iter()
            .map(|c| match c {
                Call::Write { stream: s, bytes } if *s == stream => *bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn drains(&self) -> Vec<StreamHandle> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Drain(h) => Some(*h),
                _ => None,
            })
            .collect()
    }

    pub fn released(&self) -> Vec<StreamHandle> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::DisconnectStream(h) => Some(*h),
                _ => None,
            })
            .collect()
    }

    pub fn disconnected(&self) -> bool {
        self.calls.contains(&Call::Disconnect)
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, server: Option<&str>, client_name: &str) -> Result<()> {
        self.calls.push(Call::Connect {
            server: server.map(str::to_string),
            client_name: client_name.to_string(),
        });

        for state in [
            ConnectionState::Connecting,
            ConnectionState::Authorizing,
            ConnectionState::SettingName,
        ] {
            self.emit(TransportEvent::ConnectionState(state));
        }
        if self.fail_connection {
            self.error = Some("Connection refused".to_string());
            self.emit(TransportEvent::ConnectionState(ConnectionState::Failed));
        } else {
            self.emit(TransportEvent::ConnectionState(ConnectionState::Ready));
        }
        Ok(())
    }

    fn create_stream(&mut self, request: &StreamRequest<'_>) -> Result<StreamHandle> {
        if self.refuse_streams {
            self.error = Some("Too many streams".to_string());
            return Err(Error::StreamFailed("Too many streams".to_string()));
        }

        let handle = StreamHandle(self.next_handle);
        self.next_handle += 1;
        self.calls.push(Call::CreateStream {
            handle,
            name: request.name.to_string(),
            spec: request.spec,
            volume: request.volume,
            device: request.device.map(str::to_string),
            map_channels: request.channel_map.map(|m| m.channels()),
        });

        self.emit(TransportEvent::StreamState {
            stream: handle,
            state: StreamState::Creating,
        });
        self.emit(TransportEvent::StreamState {
            stream: handle,
            state: StreamState::Ready,
        });
        self.emit(TransportEvent::WriteReady {
            stream: handle,
            length: self.write_chunk,
        });
        Ok(handle)
    }

    fn write(&mut self, stream: StreamHandle, data: &[u8]) -> Result<usize> {
        self.calls.push(Call::Write {
            stream,
            bytes: data.len(),
        });
        self.emit(TransportEvent::WriteReady {
            stream,
            length: self.write_chunk,
        });
        Ok(data.len())
    }

    fn drain(&mut self, stream: StreamHandle) -> Result<()> {
        self.calls.push(Call::Drain(stream));
        self.emit(TransportEvent::DrainComplete {
            stream,
            success: !self.fail_drain,
        });
        Ok(())
    }

    fn disconnect_stream(&mut self, stream: StreamHandle) -> Result<()> {
        self.calls.push(Call::DisconnectStream(stream));
        self.emit(TransportEvent::StreamState {
            stream,
            state: StreamState::Terminated,
        });
        Ok(())
    }

    fn disconnect(&mut self) {
        self.calls.push(Call::Disconnect);
        self.emit(TransportEvent::ConnectionState(ConnectionState::Terminated));
    }

    fn last_error(&self) -> Option<String> {
        self.error.clone()
    }
}
