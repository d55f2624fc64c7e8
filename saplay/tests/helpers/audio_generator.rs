//! Audio Test File Generation Utilities
//!
//! Generate small deterministic WAV files with known sample counts, so tests
//! can predict exactly how many bytes a slot pushes before it drains.

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

/// A generated file and the numbers tests reason about
#[derive(Debug, Clone)]
pub struct WavFixture {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u32,
}

impl WavFixture {
    /// Decoded size in the transport format
    pub fn transport_bytes(&self, bytes_per_sample: usize) -> usize {
        self.frames as usize * self.channels as usize * bytes_per_sample
    }
}

/// Generate a 16-bit PCM sine WAV file
///
/// # Arguments
/// * `path` - Output file path
/// * `sample_rate` - Frames per second
/// * `channels` - Channel count (the same sine on every channel)
/// * `frames` - Number of frames to write
///
/// # Returns
/// The fixture description, or the hound error.
pub fn generate_pcm_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    frames: u32,
) -> Result<WavFixture, hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    for frame_idx in 0..frames {
        let value = sine(frame_idx, sample_rate);
        let sample = (value * 0.5 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;

    Ok(WavFixture {
        path: path.as_ref().to_path_buf(),
        sample_rate,
        channels,
        frames,
    })
}

/// Generate a 32-bit IEEE float sine WAV file
///
/// # Arguments
/// Same as [`generate_pcm_wav`].
pub fn generate_float_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    frames: u32,
) -> Result<WavFixture, hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    for frame_idx in 0..frames {
        let sample = sine(frame_idx, sample_rate) * 0.5;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;

    Ok(WavFixture {
        path: path.as_ref().to_path_buf(),
        sample_rate,
        channels,
        frames,
    })
}

/// G.711 companding law for [`generate_g711_wav`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum G711Law {
    ULaw,
    ALaw,
}

impl G711Law {
    /// WAVE format tag
    fn format_tag(self) -> u16 {
        match self {
            G711Law::ULaw => 7,
            G711Law::ALaw => 6,
        }
    }
}

/// Write a mono 8-bit G.711 WAV file whose data chunk is `data` as given
///
/// hound only writes PCM and float, so the RIFF header is built here.
///
/// # Returns
/// The fixture description; `frames` equals `data.len()`.
pub fn generate_g711_wav<P: AsRef<Path>>(
    path: P,
    law: G711Law,
    sample_rate: u32,
    data: &[u8],
) -> std::io::Result<WavFixture> {
    let data_len = data.len() as u32;
    let mut bytes = Vec::with_capacity(44 + data.len() + 1);

    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len + data_len % 2).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&law.format_tag().to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // channels
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes()); // bytes per second
    bytes.extend_from_slice(&1u16.to_le_bytes()); // block align
    bytes.extend_from_slice(&8u16.to_le_bytes()); // bits per sample

    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.extend_from_slice(data);
    if data.len() % 2 == 1 {
        bytes.push(0);
    }

    std::fs::write(path.as_ref(), bytes)?;

    Ok(WavFixture {
        path: path.as_ref().to_path_buf(),
        sample_rate,
        channels: 1,
        frames: data_len,
    })
}

/// Recognizable byte pattern for raw-read checks
pub fn counting_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

/// 440 Hz sine value for a frame
fn sine(frame_idx: u32, sample_rate: u32) -> f32 {
    let t = frame_idx as f32 / sample_rate as f32;
    (2.0 * PI * 440.0 * t).sin()
}
