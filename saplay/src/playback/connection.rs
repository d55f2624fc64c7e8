//! Connection to the playback service
//!
//! Wraps the [`Transport`] session in an explicit state machine. The
//! connection becomes ready at most once; failure and termination are both
//! terminal, and there is no reconnect.
//!
//! ```text
//! Unconnected --connect()--> Connecting --Ready--> Ready --disconnect()--> Closing
//!                                |                   |                       |
//!                                +-------------------+-----------------------+
//!                                         Failed -> Failed
//!                                     Terminated -> Terminated
//! ```

use crate::error::{Error, Result};
use crate::transport::{ConnectionState, StreamHandle, StreamRequest, Transport};
use tracing::{debug, info};

/// Where the session currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Unconnected,
    /// Connect requested; waiting for the service
    Connecting,
    Ready,
    /// Disconnect requested; waiting for `Terminated`
    Closing,
    Failed,
    Terminated,
}

impl ConnectionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionPhase::Failed | ConnectionPhase::Terminated)
    }
}

/// What a connection state event meant for the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// Still negotiating; nothing to do
    Pending,
    /// The session just became ready; streams may now be created
    BecameReady,
    /// The session ended gracefully
    Closed,
}

/// The single session to the playback service
pub struct Connection<T: Transport> {
    transport: T,
    server: Option<String>,
    client_name: String,
    phase: ConnectionPhase,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, server: Option<String>, client_name: String) -> Self {
        Self {
            transport,
            server,
            client_name,
            phase: ConnectionPhase::Unconnected,
        }
    }

    /// Begin connecting. The outcome arrives through [`Connection::on_state`].
    ///
    /// # Errors
    /// `IllegalTransition` if called twice; `ConnectionFailed` if the
    /// transport refuses to start.
    pub fn connect(&mut self) -> Result<()> {
        if self.phase != ConnectionPhase::Unconnected {
            return Err(Error::illegal("connection", self.phase, "connect"));
        }

        info!(
            "Connecting to {} as '{}'",
            self.server.as_deref().unwrap_or("default server"),
            self.client_name
        );

        self.phase = ConnectionPhase::Connecting;
        if let Err(e) = self
            .transport
            .connect(self.server.as_deref(), &self.client_name)
        {
            self.phase = ConnectionPhase::Failed;
            return Err(Error::ConnectionFailed(e.to_string()));
        }
        Ok(())
    }

    /// Apply a connection state event from the transport
    ///
    /// # Returns
    /// What the event means for the caller.
    ///
    /// # Errors
    /// `ConnectionFailed` (with the transport's error text) on a `Failed`
    /// event, `IllegalTransition` for an event the current phase does not
    /// accept.
    pub fn on_state(&mut self, state: ConnectionState) -> Result<ConnectionOutcome> {
        use ConnectionPhase as P;
        use ConnectionState as S;

        let (next, outcome) = match (self.phase, state) {
            (P::Connecting, S::Connecting | S::Authorizing | S::SettingName) => {
                debug!("Connection progress: {:?}", state);
                (P::Connecting, ConnectionOutcome::Pending)
            }
            (P::Connecting, S::Ready) => (P::Ready, ConnectionOutcome::BecameReady),
            (P::Connecting | P::Ready | P::Closing, S::Terminated) => {
                (P::Terminated, ConnectionOutcome::Closed)
            }
            (P::Connecting | P::Ready | P::Closing, S::Failed) => {
                self.phase = P::Failed;
                let reason = self
                    .transport
                    .last_error()
                    .unwrap_or_else(|| "unknown error".to_string());
                return Err(Error::ConnectionFailed(reason));
            }
            (phase, state) => return Err(Error::illegal("connection", phase, state)),
        };

        if next != self.phase {
            debug!("Connection {:?} -> {:?}", self.phase, next);
        }
        self.phase = next;
        Ok(outcome)
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == ConnectionPhase::Ready
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Create a playback stream on the ready session
    ///
    /// # Errors
    /// `StreamFailed` if the session is not ready or the transport refuses.
    pub fn create_stream(&mut self, request: &StreamRequest<'_>) -> Result<StreamHandle> {
        if !self.is_ready() {
            return Err(Error::StreamFailed(format!(
                "cannot create stream '{}': connection is {:?}",
                request.name, self.phase
            )));
        }
        self.transport.create_stream(request)
    }

    pub fn write(&mut self, stream: StreamHandle, data: &[u8]) -> Result<usize> {
        self.transport.write(stream, data)
    }

    pub fn drain(&mut self, stream: StreamHandle) -> Result<()> {
        self.transport.drain(stream)
    }

    /// Give a transport handle back to the service
    pub fn release_stream(&mut self, stream: StreamHandle) -> Result<()> {
        self.transport.disconnect_stream(stream)
    }

    /// Close the session. A no-op unless the session is ready.
    pub fn disconnect(&mut self) {
        if self.phase == ConnectionPhase::Ready {
            debug!("Connection {:?} -> {:?}", self.phase, ConnectionPhase::Closing);
            self.phase = ConnectionPhase::Closing;
            self.transport.disconnect();
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.transport.last_error()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
