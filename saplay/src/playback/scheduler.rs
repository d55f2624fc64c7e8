//! Slot scheduler
//!
//! Holds the configured slots and decides, once per tick, which of them to
//! (re)start. Nothing starts before the connection is ready. After that,
//! every tick starts each healthy slot that holds no transport handle,
//! which is what makes every slot loop forever.
//!
//! Stream events are routed to the slot whose stream owns the handle.
//! Events for handles no slot owns (a stream released during shutdown,
//! say) are dropped.

use crate::config::SlotConfig;
use crate::error::Error;
use crate::playback::connection::Connection;
use crate::playback::stream::{PlaybackStream, StreamPhase};
use crate::transport::{StreamHandle, StreamState, Transport};
use tracing::{debug, info, trace, warn};

/// A slot that hit an error its stream cannot recover from
#[derive(Debug)]
pub struct SlotFault {
    pub slot: usize,
    pub error: Error,
}

/// One configured playback source
pub struct Slot {
    index: usize,
    config: SlotConfig,
    stream: Option<PlaybackStream>,
    /// Unusable configuration; never started
    disabled: bool,
    open_failures: u32,
}

impl Slot {
    fn new(index: usize, config: SlotConfig) -> Self {
        Self {
            index,
            config,
            stream: None,
            disabled: false,
            open_failures: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    pub fn stream(&self) -> Option<&PlaybackStream> {
        self.stream.as_ref()
    }

    pub fn phase(&self) -> Option<StreamPhase> {
        self.stream.as_ref().map(PlaybackStream::phase)
    }

    pub fn handle(&self) -> Option<StreamHandle> {
        self.stream.as_ref().and_then(PlaybackStream::handle)
    }

    /// Consecutive failed attempts to open the file
    pub fn open_failures(&self) -> u32 {
        self.open_failures
    }

    pub fn is_failed(&self) -> bool {
        self.disabled || self.phase() == Some(StreamPhase::Failed)
    }

    fn record_open_failure(&mut self, error: &Error) {
        self.open_failures += 1;
        if self.open_failures == 1 {
            warn!("Slot {}: {}; retrying every tick", self.index, error);
        } else {
            debug!(
                "Slot {}: open attempt {} failed: {}",
                self.index, self.open_failures, error
            );
        }
    }

    /// Start the slot if it is idle
    fn start<T: Transport>(&mut self, conn: &mut Connection<T>) -> Option<SlotFault> {
        if self.stream.is_none() {
            match PlaybackStream::open(self.config.clone()) {
                Ok(stream) => self.stream = Some(stream),
                Err(e @ Error::OpenFailed { .. }) => {
                    self.record_open_failure(&e);
                    return None;
                }
                Err(error) => {
                    self.disabled = true;
                    return Some(SlotFault {
                        slot: self.index,
                        error,
                    });
                }
            }
        }

        let stream = self.stream.as_mut()?;
        match stream.start(conn) {
            Ok(_) => {
                if self.open_failures > 0 {
                    info!(
                        "Slot {}: '{}' opened after {} failed attempts",
                        self.index,
                        stream.name(),
                        self.open_failures
                    );
                }
                self.open_failures = 0;
                None
            }
            Err(e @ Error::OpenFailed { .. }) => {
                self.record_open_failure(&e);
                None
            }
            Err(error) => Some(SlotFault {
                slot: self.index,
                error,
            }),
        }
    }
}

/// Periodic slot scheduler
pub struct Scheduler {
    slots: Vec<Slot>,
    first_start_done: bool,
    shutting_down: bool,
}

impl Scheduler {
    pub fn new(configs: Vec<SlotConfig>) -> Self {
        Self {
            slots: configs
                .into_iter()
                .enumerate()
                .map(|(index, config)| Slot::new(index, config))
                .collect(),
            first_start_done: false,
            shutting_down: false,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn first_start_done(&self) -> bool {
        self.first_start_done
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// One scheduling pass
    ///
    /// Waits for the connection on ticks before readiness. The first tick
    /// after readiness starts every slot; later ticks restart slots whose
    /// stream has gone idle. Slots holding a transport handle are never
    /// started again, and failed slots are skipped.
    ///
    /// # Returns
    /// Faults raised while starting slots.
    pub fn tick<T: Transport>(&mut self, conn: &mut Connection<T>) -> Vec<SlotFault> {
        if self.shutting_down {
            return Vec::new();
        }
        if !conn.is_ready() {
            debug!("Tick: connection not ready ({:?})", conn.phase());
            return Vec::new();
        }

        if !self.first_start_done {
            self.first_start_done = true;
            info!("Starting {} playback slots", self.slots.len());
        }

        let mut faults = Vec::new();
        for slot in &mut self.slots {
            if slot.is_failed() || slot.handle().is_some() {
                continue;
            }
            debug!("Tick: starting slot {}", slot.index);
            if let Some(fault) = slot.start(conn) {
                faults.push(fault);
            }
        }
        faults
    }

    fn slot_for(&mut self, handle: StreamHandle) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.handle() == Some(handle))
    }

    /// Route a stream state event
    pub fn on_stream_state<T: Transport>(
        &mut self,
        conn: &mut Connection<T>,
        handle: StreamHandle,
        state: StreamState,
    ) -> Option<SlotFault> {
        self.dispatch(handle, |stream| stream.on_state(conn, state))
    }

    /// Route a write request
    pub fn on_write_ready<T: Transport>(
        &mut self,
        conn: &mut Connection<T>,
        handle: StreamHandle,
        length: usize,
    ) -> Option<SlotFault> {
        self.dispatch(handle, |stream| stream.on_write_ready(conn, length))
    }

    /// Route a drain completion
    pub fn on_drain_complete<T: Transport>(
        &mut self,
        conn: &mut Connection<T>,
        handle: StreamHandle,
        success: bool,
    ) -> Option<SlotFault> {
        self.dispatch(handle, |stream| stream.on_drain_complete(conn, success))
    }

    fn dispatch<F>(&mut self, handle: StreamHandle, f: F) -> Option<SlotFault>
    where
        F: FnOnce(&mut PlaybackStream) -> crate::Result<()>,
    {
        let Some(slot) = self.slot_for(handle) else {
            trace!("Ignoring event for released stream {}", handle);
            return None;
        };
        let index = slot.index;
        let stream = slot.stream.as_mut()?;
        f(stream).err().map(|error| SlotFault { slot: index, error })
    }

    /// Stop a slot for good, releasing its stream
    pub fn fail_slot<T: Transport>(&mut self, conn: &mut Connection<T>, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.disabled = true;
            if let Some(stream) = slot.stream.as_mut() {
                stream.fail(conn);
            }
        }
    }

    /// Stop scheduling and terminate every stream holding a handle
    ///
    /// # Returns
    /// Faults from streams that could not be terminated cleanly.
    pub fn begin_shutdown<T: Transport>(&mut self, conn: &mut Connection<T>) -> Vec<SlotFault> {
        self.shutting_down = true;

        let mut faults = Vec::new();
        for slot in &mut self.slots {
            let Some(stream) = slot.stream.as_mut() else {
                continue;
            };
            if !stream.has_transport_handle() {
                continue;
            }
            debug!("Terminating slot {} ('{}')", slot.index, stream.name());
            if let Err(error) = stream.terminate(conn) {
                faults.push(SlotFault {
                    slot: slot.index,
                    error,
                });
            }
        }
        faults
    }

    /// Release every stream without draining
    pub fn release_all<T: Transport>(&mut self, conn: &mut Connection<T>) {
        for stream in self.slots.iter_mut().filter_map(|s| s.stream.as_mut()) {
            stream.release(conn);
        }
    }

    /// No slot holds a transport handle
    pub fn is_quiescent(&self) -> bool {
        self.slots.iter().all(|s| s.handle().is_none())
    }

    /// Every slot has failed (false when there are no slots)
    pub fn all_failed(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(Slot::is_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scheduler_state() {
        let scheduler = Scheduler::new(vec![
            SlotConfig::new("/a.wav"),
            SlotConfig::new("/b.wav"),
        ]);

        assert_eq!(scheduler.slots().len(), 2);
        assert_eq!(scheduler.slots()[1].index(), 1);
        assert!(!scheduler.first_start_done());
        assert!(scheduler.is_quiescent());
        assert!(!scheduler.all_failed());
    }

    #[test]
    fn test_no_slots_never_all_failed() {
        assert!(!Scheduler::new(Vec::new()).all_failed());
    }
}
