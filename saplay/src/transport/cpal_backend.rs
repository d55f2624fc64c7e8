//! Playback transport backed by the local audio output (cpal)
//!
//! Maps the session/stream model onto cpal:
//! - the session is a cpal host, selected by name (`--server`)
//! - each stream is a cpal output stream on a device (`--device`), fed
//!   from a [`SampleRing`] that the audio callback drains
//!
//! Stream bytes arrive in the transport sample format (S16/F32 native
//! endian or G.711) and are converted to f32 with the stream volume
//! applied before entering the ring.

use crate::audio::g711;
use crate::error::{Error, Result};
use crate::event_loop::EventSender;
use crate::transport::ring::{RingNotice, SampleConsumer, SampleProducer, SampleRing};
use crate::transport::{
    ConnectionState, StreamHandle, StreamRequest, StreamState, Transport, TransportEvent,
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Host, Sample, SampleFormat as DeviceSampleFormat, SizedSample};
use saplay_common::{SampleFormat, SampleSpec};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, trace, warn};

/// Ring length per stream, in milliseconds of audio
const RING_MS: usize = 250;

/// One open output stream
struct OutputStream {
    /// Keeps the device stream alive; dropping it stops playback
    stream: cpal::Stream,
    producer: SampleProducer,
    spec: SampleSpec,
    gain: f32,
    name: String,
}

/// cpal-backed [`Transport`]
pub struct CpalTransport {
    events: EventSender,
    host: Option<Host>,
    client_name: String,
    streams: HashMap<StreamHandle, OutputStream>,
    next_handle: u64,
    last_error: Arc<Mutex<Option<String>>>,
}

impl CpalTransport {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            host: None,
            client_name: String::new(),
            streams: HashMap::new(),
            next_handle: 1,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Names of the hosts compiled into this build
    pub fn available_servers() -> Vec<&'static str> {
        cpal::available_hosts().iter().map(|id| id.name()).collect()
    }

    fn set_error(&self, message: String) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(message);
        }
    }

    fn connection_event(&self, state: ConnectionState) {
        self.events
            .transport(TransportEvent::ConnectionState(state));
    }

    fn resolve_host(server: Option<&str>) -> std::result::Result<Host, String> {
        let Some(name) = server else {
            return Ok(cpal::default_host());
        };

        let id = cpal::available_hosts()
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                format!(
                    "Unknown server '{}' (available: {})",
                    name,
                    Self::available_servers().join(", ")
                )
            })?;

        cpal::host_from_id(id).map_err(|e| format!("Server '{}' unavailable: {}", name, e))
    }

    /// Find the requested device, falling back to the default device
    fn resolve_device(host: &Host, name: Option<&str>) -> std::result::Result<Device, String> {
        if let Some(name) = name {
            let mut devices = host
                .output_devices()
                .map_err(|e| format!("Failed to enumerate devices: {}", e))?;

            if let Some(dev) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                debug!("Found requested audio device: {}", name);
                return Ok(dev);
            }
            warn!(
                "Requested device '{}' not found, falling back to default device",
                name
            );
        }

        host.default_output_device()
            .ok_or_else(|| "No default output device found".to_string())
    }

    fn build_stream(
        &self,
        device: &Device,
        handle: StreamHandle,
        spec: &SampleSpec,
        consumer: SampleConsumer,
    ) -> std::result::Result<cpal::Stream, String> {
        let config = cpal::StreamConfig {
            channels: spec.channels as u16,
            sample_rate: cpal::SampleRate(spec.rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let device_format = device
            .default_output_config()
            .map(|c| c.sample_format())
            .unwrap_or(DeviceSampleFormat::F32);

        let frame_size = spec.frame_size();
        match device_format {
            DeviceSampleFormat::I16 => {
                self.build_typed::<i16>(device, &config, handle, frame_size, consumer)
            }
            DeviceSampleFormat::U16 => {
                self.build_typed::<u16>(device, &config, handle, frame_size, consumer)
            }
            _ => self.build_typed::<f32>(device, &config, handle, frame_size, consumer),
        }
    }

    fn build_typed<S>(
        &self,
        device: &Device,
        config: &cpal::StreamConfig,
        handle: StreamHandle,
        frame_size: usize,
        mut consumer: SampleConsumer,
    ) -> std::result::Result<cpal::Stream, String>
    where
        S: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let frame_size = frame_size.max(1);
        let data_events = self.events.clone();
        let error_events = self.events.clone();
        let last_error = Arc::clone(&self.last_error);

        device
            .build_output_stream(
                config,
                move |data: &mut [S], _: &cpal::OutputCallbackInfo| {
                    consumer.fill(data, |sample| S::from_sample(sample.clamp(-1.0, 1.0)));
                    match consumer.notice() {
                        Some(RingNotice::WriteReady(vacant)) => {
                            data_events.transport(TransportEvent::WriteReady {
                                stream: handle,
                                length: (vacant / channels) * frame_size,
                            });
                        }
                        Some(RingNotice::DrainComplete) => {
                            data_events.transport(TransportEvent::DrainComplete {
                                stream: handle,
                                success: true,
                            });
                        }
                        None => {}
                    }
                },
                move |err| {
                    error!("Audio stream {} error: {}", handle, err);
                    if let Ok(mut last) = last_error.lock() {
                        *last = Some(err.to_string());
                    }
                    error_events.transport(TransportEvent::StreamState {
                        stream: handle,
                        state: StreamState::Failed,
                    });
                },
                None,
            )
            .map_err(|e| format!("Failed to build stream: {}", e))
    }
}

/// Convert transport-format bytes to f32 samples with gain applied
pub fn bytes_to_samples(format: SampleFormat, data: &[u8], gain: f32) -> Vec<f32> {
    match format {
        SampleFormat::S16Ne => data
            .chunks_exact(2)
            .map(|b| i16::from_ne_bytes([b[0], b[1]]) as f32 / 32768.0 * gain)
            .collect(),
        SampleFormat::F32Ne => data
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]) * gain)
            .collect(),
        SampleFormat::ULaw => data
            .iter()
            .map(|&b| g711::ulaw_to_linear(b) as f32 / 32768.0 * gain)
            .collect(),
        SampleFormat::ALaw => data
            .iter()
            .map(|&b| g711::alaw_to_linear(b) as f32 / 32768.0 * gain)
            .collect(),
    }
}

impl Transport for CpalTransport {
    fn connect(&mut self, server: Option<&str>, client_name: &str) -> Result<()> {
        if self.host.is_some() {
            return Err(Error::ConnectionFailed("already connected".to_string()));
        }

        self.connection_event(ConnectionState::Connecting);

        let host = match Self::resolve_host(server) {
            Ok(host) => host,
            Err(message) => {
                self.set_error(message);
                self.connection_event(ConnectionState::Failed);
                return Ok(());
            }
        };

        self.connection_event(ConnectionState::Authorizing);

        match host.output_devices().map(|mut devices| devices.next().is_some()) {
            Ok(true) => {}
            Ok(false) => {
                self.set_error(format!("Server '{}' has no output devices", host.id().name()));
                self.connection_event(ConnectionState::Failed);
                return Ok(());
            }
            Err(e) => {
                self.set_error(format!("Failed to enumerate devices: {}", e));
                self.connection_event(ConnectionState::Failed);
                return Ok(());
            }
        }

        self.client_name = client_name.to_string();
        self.connection_event(ConnectionState::SettingName);

        info!(
            "Connected to server '{}' as '{}'",
            host.id().name(),
            self.client_name
        );
        self.host = Some(host);
        self.connection_event(ConnectionState::Ready);
        Ok(())
    }

    fn create_stream(&mut self, request: &StreamRequest<'_>) -> Result<StreamHandle> {
        let host = self
            .host
            .as_ref()
            .ok_or_else(|| Error::StreamFailed("not connected".to_string()))?;

        if !request.spec.is_valid() {
            return Err(Error::StreamFailed(format!(
                "invalid sample spec '{}'",
                request.spec
            )));
        }
        if let Some(map) = request.channel_map {
            if !map.is_compatible(&request.spec) {
                return Err(Error::StreamFailed(format!(
                    "channel map '{}' does not match {} channels",
                    map, request.spec.channels
                )));
            }
        }

        let device = Self::resolve_device(host, request.device).map_err(|message| {
            self.set_error(message.clone());
            Error::StreamFailed(message)
        })?;

        let handle = StreamHandle(self.next_handle);
        self.next_handle += 1;

        let capacity = request.spec.rate as usize * request.spec.channels as usize * RING_MS / 1000;
        let (producer, consumer) = SampleRing::new(capacity).split();

        let stream = self
            .build_stream(&device, handle, &request.spec, consumer)
            .map_err(|message| {
                self.set_error(message.clone());
                Error::StreamFailed(message)
            })?;
        debug!(
            "Created stream {} '{}' ({}, volume {}{})",
            handle,
            request.name,
            request.spec,
            request.volume,
            request
                .channel_map
                .map(|m| format!(", map {}", m))
                .unwrap_or_default()
        );

        self.streams.insert(
            handle,
            OutputStream {
                stream,
                producer,
                spec: request.spec,
                gain: request.volume.gain(),
                name: request.name.to_string(),
            },
        );

        // Ready is queued before the first callback can ask for data
        self.events.transport(TransportEvent::StreamState {
            stream: handle,
            state: StreamState::Creating,
        });
        self.events.transport(TransportEvent::StreamState {
            stream: handle,
            state: StreamState::Ready,
        });

        if let Some(output) = self.streams.get(&handle) {
            if let Err(e) = output.stream.play() {
                self.streams.remove(&handle);
                let message = format!("Failed to start stream: {}", e);
                self.set_error(message.clone());
                return Err(Error::StreamFailed(message));
            }
        }
        Ok(handle)
    }

    fn write(&mut self, stream: StreamHandle, data: &[u8]) -> Result<usize> {
        let output = self
            .streams
            .get_mut(&stream)
            .ok_or_else(|| Error::StreamFailed(format!("unknown stream {}", stream)))?;
        if output.producer.is_draining() {
            return Err(Error::StreamFailed(format!(
                "write to stream {} after drain was requested",
                stream
            )));
        }

        let samples = bytes_to_samples(output.spec.format, data, output.gain);
        let pushed = output.producer.push(&samples);
        if pushed < samples.len() {
            trace!(
                "Stream {} overrun: {} of {} samples accepted",
                stream,
                pushed,
                samples.len()
            );
        }
        let bytes_per_sample = output.spec.format.bytes_per_sample();
        Ok(pushed * bytes_per_sample)
    }

    fn drain(&mut self, stream: StreamHandle) -> Result<()> {
        let output = self
            .streams
            .get(&stream)
            .ok_or_else(|| Error::StreamFailed(format!("unknown stream {}", stream)))?;
        if output.producer.is_draining() {
            debug!("Stream {} already draining", stream);
            return Ok(());
        }
        debug!(
            "Draining stream {} '{}' (underruns: {}, overruns: {})",
            stream,
            output.name,
            output.producer.underruns(),
            output.producer.overruns()
        );
        output.producer.begin_drain();
        Ok(())
    }

    fn disconnect_stream(&mut self, stream: StreamHandle) -> Result<()> {
        match self.streams.remove(&stream) {
            Some(output) => {
                debug!("Released stream {} '{}'", stream, output.name);
                drop(output);
                self.events.transport(TransportEvent::StreamState {
                    stream,
                    state: StreamState::Terminated,
                });
                Ok(())
            }
            None => Err(Error::StreamFailed(format!("unknown stream {}", stream))),
        }
    }

    fn disconnect(&mut self) {
        let count = self.streams.len();
        self.streams.clear();
        if self.host.take().is_some() {
            info!("Disconnected from server ({} streams closed)", count);
        }
        self.connection_event(ConnectionState::Terminated);
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|last| last.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s16_conversion_with_gain() {
        let mut data = Vec::new();
        data.extend_from_slice(&16384i16.to_ne_bytes());
        data.extend_from_slice(&(-32768i16).to_ne_bytes());

        let samples = bytes_to_samples(SampleFormat::S16Ne, &data, 1.0);
        assert_eq!(samples, vec![0.5, -1.0]);

        let samples = bytes_to_samples(SampleFormat::S16Ne, &data, 0.5);
        assert_eq!(samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_f32_conversion() {
        let mut data = Vec::new();
        data.extend_from_slice(&0.75f32.to_ne_bytes());
        data.extend_from_slice(&(-0.125f32).to_ne_bytes());

        let samples = bytes_to_samples(SampleFormat::F32Ne, &data, 1.0);
        assert_eq!(samples, vec![0.75, -0.125]);
    }

    #[test]
    fn test_g711_conversion() {
        let samples = bytes_to_samples(SampleFormat::ULaw, &[0xFF, 0x80], 1.0);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 32124.0 / 32768.0).abs() < f32::EPSILON);

        let samples = bytes_to_samples(SampleFormat::ALaw, &[0xD5], 1.0);
        assert_eq!(samples, vec![8.0 / 32768.0]);
    }

    #[test]
    fn test_partial_samples_ignored() {
        let samples = bytes_to_samples(SampleFormat::F32Ne, &[0, 0, 0], 1.0);
        assert!(samples.is_empty());
    }
}
