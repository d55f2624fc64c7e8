//! Player: the context object every event handler runs against
//!
//! Owns the connection and the scheduler, applies the failure policy, and
//! runs graceful shutdown. Handlers never block and never call back into
//! the event loop; a fatal condition records an exit code through
//! [`Player::quit`] and the loop stops after the current dispatch.

use crate::error::Error;
use crate::playback::connection::{Connection, ConnectionOutcome};
use crate::playback::scheduler::{Scheduler, SlotFault};
use crate::transport::{ConnectionState, Transport, TransportEvent};
use saplay_common::config::FailurePolicy;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Behavior knobs for the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerOptions {
    pub failure_policy: FailurePolicy,
    /// How long an interrupt waits for streams to drain
    pub shutdown_grace: Duration,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Isolate,
            shutdown_grace: crate::config::DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

pub struct Player<T: Transport> {
    connection: Connection<T>,
    scheduler: Scheduler,
    options: PlayerOptions,
    exit_code: Option<i32>,
    /// Set once an interrupt started the shutdown
    shutdown_deadline: Option<Instant>,
}

impl<T: Transport> Player<T> {
    pub fn new(connection: Connection<T>, scheduler: Scheduler, options: PlayerOptions) -> Self {
        Self {
            connection,
            scheduler,
            options,
            exit_code: None,
            shutdown_deadline: None,
        }
    }

    /// Begin connecting to the playback service
    pub fn start(&mut self) {
        if let Err(e) = self.connection.connect() {
            error!("{}", e);
            self.quit(e.exit_code());
        }
    }

    /// Request the loop to stop. The first code wins.
    pub fn quit(&mut self, code: i32) {
        if self.exit_code.is_none() {
            debug!("Quit requested with exit code {}", code);
            self.exit_code = Some(code);
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_deadline.is_some()
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection<T> {
        &mut self.connection
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Periodic tick
    pub fn on_tick(&mut self) {
        if let Some(deadline) = self.shutdown_deadline {
            if Instant::now() >= deadline {
                warn!(
                    "Streams did not drain within {:?}, exiting",
                    self.options.shutdown_grace
                );
                self.quit(0);
            }
            return;
        }

        let faults = self.scheduler.tick(&mut self.connection);
        self.handle_faults(faults);
    }

    pub fn on_transport_event(&mut self, event: TransportEvent) {
        let fault = match event {
            TransportEvent::ConnectionState(state) => {
                self.on_connection_state(state);
                return;
            }
            TransportEvent::StreamState { stream, state } => {
                self.scheduler
                    .on_stream_state(&mut self.connection, stream, state)
            }
            TransportEvent::WriteReady { stream, length } => {
                self.scheduler
                    .on_write_ready(&mut self.connection, stream, length)
            }
            TransportEvent::DrainComplete { stream, success } => {
                self.scheduler
                    .on_drain_complete(&mut self.connection, stream, success)
            }
        };

        self.handle_faults(fault.into_iter().collect());
        if self.is_shutting_down() {
            self.finish_shutdown_if_quiescent();
        }
    }

    fn on_connection_state(&mut self, state: ConnectionState) {
        match self.connection.on_state(state) {
            Ok(ConnectionOutcome::Pending) => {}
            Ok(ConnectionOutcome::BecameReady) => {
                info!("Connection established");
            }
            Ok(ConnectionOutcome::Closed) => {
                info!("Connection terminated");
                self.quit(Error::ConnectionTerminated.exit_code());
            }
            Err(e) => {
                error!("{}", e);
                self.quit(e.exit_code());
            }
        }
    }

    /// Interrupt: drain and exit, or exit at once on a repeat
    pub fn on_interrupt(&mut self) {
        if self.is_shutting_down() {
            info!("Second interrupt, exiting without waiting for drain");
            self.quit(0);
            return;
        }

        if !self.connection.is_ready() {
            info!("Interrupted before the connection was ready, exiting");
            self.quit(0);
            return;
        }

        info!("Interrupted, draining streams");
        self.shutdown_deadline = Some(Instant::now() + self.options.shutdown_grace);
        let faults = self.scheduler.begin_shutdown(&mut self.connection);
        self.handle_faults(faults);
        self.finish_shutdown_if_quiescent();
    }

    fn finish_shutdown_if_quiescent(&mut self) {
        if self.scheduler.is_quiescent() && self.connection.is_ready() {
            debug!("All streams released, disconnecting");
            self.connection.disconnect();
        }
    }

    fn handle_faults(&mut self, faults: Vec<SlotFault>) {
        if faults.is_empty() {
            return;
        }

        for fault in faults {
            error!("Slot {} failed: {}", fault.slot, fault.error);
            if self.options.failure_policy == FailurePolicy::Abort && !self.is_shutting_down() {
                self.quit(1);
            }
            self.scheduler.fail_slot(&mut self.connection, fault.slot);
        }

        if self.scheduler.all_failed() && !self.is_shutting_down() {
            error!("All playback slots have failed");
            self.quit(1);
        }
    }

    /// Release everything still held once the loop has stopped
    pub fn teardown(&mut self) {
        self.scheduler.release_all(&mut self.connection);
        self.connection.disconnect();
    }
}
