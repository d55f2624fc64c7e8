//! Playback stream state machine
//!
//! One outbound stream for one slot. The stream record outlives its
//! transport handles: after a drain completes the handle is released and
//! the stream returns to `Idle`, ready to be started again.
//!
//! ```text
//! Idle --start()--> Creating --Ready--> Ready --short read--> Draining
//!  ^                   |                  |                      |
//!  |                   +--terminate()-----+--terminate()-------->|
//!  +------------------------- drain complete --------------------+
//!
//! any --Failed / failed drain / illegal event--> Failed (terminal)
//! ```
//!
//! The transport handle exists exactly while the phase is `Creating`,
//! `Ready` or `Draining`; the phase enum carries it so the two cannot
//! disagree.

use crate::audio::{DecoderAdapter, ReadMode};
use crate::config::SlotConfig;
use crate::error::{Error, Result};
use crate::playback::connection::Connection;
use crate::transport::{StreamHandle, StreamRequest, StreamState, Transport};
use saplay_common::SampleSpec;
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Stream lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No transport handle; eligible for (re)start
    Idle,
    Creating(StreamHandle),
    Ready(StreamHandle),
    /// End of file reached (or terminate requested); waiting for drain
    Draining(StreamHandle),
    /// Terminal; the slot is never restarted
    Failed,
}

impl StreamPhase {
    pub fn handle(self) -> Option<StreamHandle> {
        match self {
            StreamPhase::Creating(h) | StreamPhase::Ready(h) | StreamPhase::Draining(h) => Some(h),
            StreamPhase::Idle | StreamPhase::Failed => None,
        }
    }
}

/// One playback stream and its decode session
pub struct PlaybackStream {
    config: SlotConfig,
    name: String,
    /// Fixed when the file is first opened
    spec: SampleSpec,
    decoder: Option<DecoderAdapter>,
    phase: StreamPhase,
    /// A write request that arrived while still `Creating`
    deferred_write: Option<usize>,
    bytes_written: u64,
    plays_completed: u64,
}

impl PlaybackStream {
    /// Open the slot's file and build the stream record
    ///
    /// # Errors
    /// - `OpenFailed` if the decoder cannot open the file
    /// - `InvalidArgument` if the configured channel map does not match the
    ///   file's channel count
    pub fn open(config: SlotConfig) -> Result<Self> {
        let decoder = DecoderAdapter::open(&config.path)?;
        let spec = decoder.sample_spec();

        if let Some(map) = &config.channel_map {
            if !map.is_compatible(&spec) {
                return Err(Error::InvalidArgument(format!(
                    "Channel map '{}' has {} channels but {} has {}",
                    map,
                    map.channels(),
                    config.path.display(),
                    spec.channels
                )));
            }
        }

        let name = config
            .stream_name
            .clone()
            .or_else(|| decoder.info().title.clone())
            .map(|n| sanitize_name(&n))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| name_from_path(&config.path));

        debug!(
            "Using sample spec '{}' for stream '{}' ({})",
            spec,
            name,
            config.path.display()
        );

        Ok(Self {
            config,
            name,
            spec,
            decoder: Some(decoder),
            phase: StreamPhase::Idle,
            deferred_write: None,
            bytes_written: 0,
            plays_completed: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn spec(&self) -> SampleSpec {
        self.spec
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn handle(&self) -> Option<StreamHandle> {
        self.phase.handle()
    }

    pub fn has_transport_handle(&self) -> bool {
        self.handle().is_some()
    }

    /// Number of times the file has been played to the end and drained
    pub fn plays_completed(&self) -> u64 {
        self.plays_completed
    }

    /// Bytes pushed to the transport during the current play
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Request a new transport stream for the next play
    ///
    /// # Returns
    /// `false` (with a warning) if the stream is not idle; nothing changes.
    ///
    /// # Errors
    /// `OpenFailed` if the file cannot be reopened (the stream stays idle),
    /// `StreamFailed` if the transport refuses the stream.
    pub fn start<T: Transport>(&mut self, conn: &mut Connection<T>) -> Result<bool> {
        if self.phase != StreamPhase::Idle {
            warn!(
                "Stream '{}' already started ({:?}), ignoring start",
                self.name, self.phase
            );
            return Ok(false);
        }

        let needs_reopen = self.decoder.as_ref().map_or(true, DecoderAdapter::is_closed);
        if needs_reopen {
            let decoder = DecoderAdapter::open(&self.config.path)?;
            if decoder.sample_spec() != self.spec {
                return Err(Error::StreamFailed(format!(
                    "{} changed format from '{}' to '{}'",
                    self.config.path.display(),
                    self.spec,
                    decoder.sample_spec()
                )));
            }
            trace!("Reopened {}", self.config.path.display());
            self.decoder = Some(decoder);
        }

        let request = StreamRequest {
            name: &self.name,
            spec: self.spec,
            channel_map: self.config.channel_map.as_ref(),
            volume: self.config.volume,
            device: self.config.device.as_deref(),
        };
        let handle = conn.create_stream(&request)?;

        debug!("Stream '{}' Idle -> Creating ({})", self.name, handle);
        self.phase = StreamPhase::Creating(handle);
        self.deferred_write = None;
        self.bytes_written = 0;
        Ok(true)
    }

    /// Apply a stream state event from the transport
    ///
    /// # Errors
    /// `StreamFailed` for a `Failed` event, `IllegalTransition` for an event
    /// the current phase does not accept.
    pub fn on_state<T: Transport>(
        &mut self,
        conn: &mut Connection<T>,
        state: StreamState,
    ) -> Result<()> {
        match (self.phase, state) {
            (_, StreamState::Failed) => Err(Error::StreamFailed(format!(
                "stream '{}': {}",
                self.name,
                conn.last_error()
                    .unwrap_or_else(|| "failed in transport".to_string())
            ))),
            (StreamPhase::Creating(_), StreamState::Creating) | (_, StreamState::Terminated) => {
                debug!("Stream '{}' reported {:?}", self.name, state);
                Ok(())
            }
            (StreamPhase::Creating(h), StreamState::Ready) => {
                info!("Stream '{}' successfully created ({})", self.name, h);
                self.phase = StreamPhase::Ready(h);
                if let Some(length) = self.deferred_write.take() {
                    self.on_write_ready(conn, length)?;
                }
                Ok(())
            }
            (phase, state) => Err(Error::illegal("stream", phase, state)),
        }
    }

    /// Service a write request of up to `length` bytes
    ///
    /// Pulls whole frames (or raw bytes for G.711 sources) from the decoder
    /// and pushes exactly what was obtained. Getting less than was asked
    /// for means end of file: the decode session is closed and a drain is
    /// requested.
    ///
    /// # Errors
    /// Transport write or drain failures.
    pub fn on_write_ready<T: Transport>(
        &mut self,
        conn: &mut Connection<T>,
        length: usize,
    ) -> Result<()> {
        let handle = match self.phase {
            StreamPhase::Ready(h) => h,
            StreamPhase::Creating(_) => {
                debug!("Stream '{}' deferring write request until ready", self.name);
                self.deferred_write = Some(length);
                return Ok(());
            }
            StreamPhase::Draining(_) => {
                debug!("Stream '{}' draining, ignoring write request", self.name);
                return Ok(());
            }
            phase => return Err(Error::illegal("stream", phase, "write request")),
        };

        let frame_size = self.spec.frame_size();
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(Error::NoActiveStream(format!(
                "stream '{}' has no decode session",
                self.name
            )));
        };

        let (requested, data) = match decoder.read_mode() {
            ReadMode::Frames => {
                let frames = length / frame_size;
                if frames == 0 {
                    debug!("Stream '{}' write request below one frame", self.name);
                    return Ok(());
                }
                let (data, _) = decoder.read_frames(frames);
                (frames * frame_size, data)
            }
            ReadMode::Raw => (length, decoder.read_raw(length)),
        };

        debug!(
            "Stream '{}' write request {} bytes, got {}",
            self.name,
            requested,
            data.len()
        );

        if !data.is_empty() {
            let accepted = conn.write(handle, &data)?;
            if accepted < data.len() {
                warn!(
                    "Stream '{}' transport accepted {} of {} bytes",
                    self.name,
                    accepted,
                    data.len()
                );
            }
            self.bytes_written += data.len() as u64;
        }

        if data.len() < requested {
            decoder.close();
            conn.drain(handle)?;
            let seconds = self.bytes_written as f64 / self.spec.bytes_per_second().max(1) as f64;
            debug!(
                "Stream '{}' Ready -> Draining after {} bytes ({:.2}s)",
                self.name, self.bytes_written, seconds
            );
            self.phase = StreamPhase::Draining(handle);
        }
        Ok(())
    }

    /// Drain finished: release the handle and become idle
    ///
    /// # Errors
    /// `StreamFailed` if the drain failed or the handle cannot be released.
    pub fn on_drain_complete<T: Transport>(
        &mut self,
        conn: &mut Connection<T>,
        success: bool,
    ) -> Result<()> {
        let StreamPhase::Draining(handle) = self.phase else {
            return Err(Error::illegal("stream", self.phase, "drain complete"));
        };

        if !success {
            return Err(Error::StreamFailed(format!(
                "failed to drain stream '{}': {}",
                self.name,
                conn.last_error().unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        conn.release_stream(handle)?;
        self.phase = StreamPhase::Idle;
        self.plays_completed += 1;
        info!(
            "Playback of '{}' finished ({} plays)",
            self.name, self.plays_completed
        );
        Ok(())
    }

    /// Stop the current play
    ///
    /// A stream still being created is released at once; a ready stream
    /// stops decoding and drains what it already queued. Completion arrives
    /// through [`PlaybackStream::on_drain_complete`].
    ///
    /// # Errors
    /// `NoActiveStream` if there is no transport handle.
    pub fn terminate<T: Transport>(&mut self, conn: &mut Connection<T>) -> Result<()> {
        match self.phase {
            StreamPhase::Creating(h) => {
                conn.release_stream(h)?;
                debug!("Stream '{}' Creating -> Idle (terminated)", self.name);
                self.phase = StreamPhase::Idle;
                Ok(())
            }
            StreamPhase::Ready(h) => {
                if let Some(decoder) = self.decoder.as_mut() {
                    decoder.close();
                }
                conn.drain(h)?;
                debug!("Stream '{}' Ready -> Draining (terminated)", self.name);
                self.phase = StreamPhase::Draining(h);
                Ok(())
            }
            StreamPhase::Draining(_) => Ok(()),
            StreamPhase::Idle | StreamPhase::Failed => Err(Error::NoActiveStream(format!(
                "cannot terminate stream '{}' ({:?})",
                self.name, self.phase
            ))),
        }
    }

    /// Mark the stream permanently failed, releasing whatever it holds
    pub fn fail<T: Transport>(&mut self, conn: &mut Connection<T>) {
        self.release(conn);
        self.phase = StreamPhase::Failed;
    }

    /// Drop the transport handle and decode session without draining
    pub fn release<T: Transport>(&mut self, conn: &mut Connection<T>) {
        if let Some(handle) = self.handle() {
            if let Err(e) = conn.release_stream(handle) {
                warn!("Failed to release stream '{}': {}", self.name, e);
            }
        }
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.close();
        }
        if self.phase != StreamPhase::Failed {
            self.phase = StreamPhase::Idle;
        }
    }
}

/// Replace control characters so the name is safe to show anywhere
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn name_from_path(path: &Path) -> String {
    let raw = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    sanitize_name(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_handle() {
        let h = StreamHandle(3);
        assert_eq!(StreamPhase::Creating(h).handle(), Some(h));
        assert_eq!(StreamPhase::Ready(h).handle(), Some(h));
        assert_eq!(StreamPhase::Draining(h).handle(), Some(h));
        assert_eq!(StreamPhase::Idle.handle(), None);
        assert_eq!(StreamPhase::Failed.handle(), None);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Front\tLeft\n"), "Front Left");
        assert_eq!(sanitize_name("  Bell  "), "Bell");
    }

    #[test]
    fn test_name_from_path() {
        assert_eq!(
            name_from_path(Path::new("/usr/share/sounds/Front_Left.wav")),
            "Front_Left.wav"
        );
    }

    #[test]
    fn test_open_missing_file_fails() {
        let result = PlaybackStream::open(SlotConfig::new("/nonexistent/slot.wav"));
        assert!(matches!(result, Err(Error::OpenFailed { .. })));
    }
}
