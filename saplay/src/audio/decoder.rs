//! Decoder adapter using symphonia
//!
//! Opens a sound file, reports its stream parameters mapped onto a transport
//! sample spec, and serves pull-based reads of whole frames (or raw encoded
//! bytes for G.711 sources).
//!
//! Reads never block on anything but local buffered file I/O. A read that
//! returns fewer bytes than requested means the file is exhausted; there is
//! no separate end-of-file signal.

use crate::audio::encoding::{ReadMode, SourceEncoding};
use crate::error::{Error, Result};
use saplay_common::format::CHANNELS_MAX;
use saplay_common::{SampleFormat, SampleSpec};
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;
use tracing::{debug, trace, warn};

/// Stream parameters discovered when a file is opened
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub sample_rate: u32,
    pub channels: u8,
    pub encoding: SourceEncoding,
    /// Embedded title tag, if the container carries one
    pub title: Option<String>,
}

impl SourceInfo {
    /// Spec of the stream pushed to the transport
    pub fn sample_spec(&self) -> SampleSpec {
        SampleSpec::new(
            self.encoding.transport_format(),
            self.sample_rate,
            self.channels,
        )
    }
}

/// Live symphonia state; dropped on close
struct DecodeSession {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
}

/// Pull-based decoder over one sound file
pub struct DecoderAdapter {
    path: PathBuf,
    info: SourceInfo,
    spec: SampleSpec,
    session: Option<DecodeSession>,
    /// Decoded bytes not yet handed out
    pending: Vec<u8>,
    exhausted: bool,
}

impl DecoderAdapter {
    /// Open a sound file for decoding.
    ///
    /// # Errors
    /// `OpenFailed` if the file cannot be read, the container is not
    /// recognized, no decodable audio track exists, or the track lacks a
    /// sample rate or usable channel count.
    pub fn open(path: &Path) -> Result<Self> {
        debug!("Opening sound file: {}", path.display());

        let file = std::fs::File::open(path).map_err(|e| Error::open_failed(path, e))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext_str);
        }

        let mut probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::open_failed(path, format!("unrecognized format: {}", e)))?;

        let container_title = probed.format.metadata().current().and_then(title_tag);
        let title = container_title.or_else(|| {
            probed
                .metadata
                .get()
                .as_ref()
                .and_then(|m| m.current())
                .and_then(title_tag)
        });

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::open_failed(path, "no audio track found"))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::open_failed(path, "sample rate not found"))?;

        let channels = codec_params
            .channels
            .map(|c| c.count())
            .ok_or_else(|| Error::open_failed(path, "channel count not found"))?;
        if channels == 0 || channels > CHANNELS_MAX as usize {
            return Err(Error::open_failed(
                path,
                format!("unsupported channel count {}", channels),
            ));
        }

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::open_failed(path, format!("unsupported codec: {}", e)))?;

        let info = SourceInfo {
            sample_rate,
            channels: channels as u8,
            encoding: SourceEncoding::from_codec_params(&codec_params),
            title,
        };
        let spec = info.sample_spec();

        debug!(
            "Source format: encoding={:?}, sample_rate={}, channels={}, transport spec '{}'",
            info.encoding, info.sample_rate, info.channels, spec
        );

        Ok(Self {
            path: path.to_path_buf(),
            info,
            spec,
            session: Some(DecodeSession {
                format,
                decoder,
                track_id,
            }),
            pending: Vec::new(),
            exhausted: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Spec of the bytes returned by reads
    pub fn sample_spec(&self) -> SampleSpec {
        self.spec
    }

    pub fn read_mode(&self) -> ReadMode {
        self.info.encoding.read_mode()
    }

    /// Read up to `max_frames` whole decoded frames.
    ///
    /// # Returns
    /// The frame bytes (native-endian, interleaved) and the number of frames
    /// they hold. Fewer frames than requested, including zero, means the
    /// end of the file was reached.
    pub fn read_frames(&mut self, max_frames: usize) -> (Vec<u8>, usize) {
        let frame_size = self.spec.frame_size();
        let bytes = self.take(max_frames * frame_size);
        let frames = bytes.len() / frame_size;
        (bytes, frames)
    }

    /// Read up to `max_bytes` encoded bytes without decoding.
    ///
    /// Used for μ-law and A-law sources, whose container bytes already are
    /// in the transport format. Short reads mean end of file.
    pub fn read_raw(&mut self, max_bytes: usize) -> Vec<u8> {
        self.take(max_bytes)
    }

    /// Release the decode handle. Safe to call more than once.
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("Closed decoder for {}", self.path.display());
        }
        self.pending.clear();
        self.exhausted = true;
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    fn take(&mut self, wanted: usize) -> Vec<u8> {
        self.fill(wanted);
        let n = wanted.min(self.pending.len());
        self.pending.drain(..n).collect()
    }

    /// Decode packets until `wanted` bytes are buffered or the file ends
    fn fill(&mut self, wanted: usize) {
        let raw = self.read_mode() == ReadMode::Raw;
        let format = self.spec.format;

        while self.pending.len() < wanted && !self.exhausted {
            let Some(session) = self.session.as_mut() else {
                self.exhausted = true;
                break;
            };

            let packet = match session.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    trace!("Reached end of {}", self.path.display());
                    self.exhausted = true;
                    break;
                }
                Err(e) => {
                    warn!("Error reading packet from {}: {}", self.path.display(), e);
                    self.exhausted = true;
                    break;
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != session.track_id {
                continue;
            }

            if raw {
                self.pending.extend_from_slice(packet.buf());
                continue;
            }

            match session.decoder.decode(&packet) {
                Ok(decoded) => match format {
                    SampleFormat::S16Ne => {
                        let mut buf =
                            SampleBuffer::<i16>::new(decoded.capacity() as u64, *decoded.spec());
                        buf.copy_interleaved_ref(decoded);
                        for sample in buf.samples() {
                            self.pending.extend_from_slice(&sample.to_ne_bytes());
                        }
                    }
                    _ => {
                        let mut buf =
                            SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                        buf.copy_interleaved_ref(decoded);
                        for sample in buf.samples() {
                            self.pending.extend_from_slice(&sample.to_ne_bytes());
                        }
                    }
                },
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping corrupt packet in {}: {}", self.path.display(), e);
                }
                Err(e) => {
                    warn!("Decoder error in {}: {}", self.path.display(), e);
                    self.exhausted = true;
                }
            }
        }
    }
}

impl Drop for DecoderAdapter {
    fn drop(&mut self) {
        self.close();
    }
}

fn title_tag(revision: &MetadataRevision) -> Option<String> {
    revision
        .tags()
        .iter()
        .find(|tag| tag.std_key == Some(StandardTagKey::TrackTitle))
        .map(|tag| tag.value.to_string())
        .filter(|title| !title.trim().is_empty())
}
