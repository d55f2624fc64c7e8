//! Audio value types shared between the decoder and the output transport
//!
//! Describes the wire-level shape of a playback stream: which sample
//! encoding is pushed to the transport, at what rate and channel count,
//! how loud, and (optionally) which speaker each channel feeds.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Maximum number of channels a stream may carry
pub const CHANNELS_MAX: u8 = 32;

/// Sample encodings accepted by the playback transport
///
/// Only four encodings cross the transport boundary. Every source file is
/// mapped onto one of them when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Signed 16-bit PCM, native endian
    S16Ne,
    /// 8-bit G.711 μ-law
    ULaw,
    /// 8-bit G.711 A-law
    ALaw,
    /// 32-bit IEEE float, native endian
    F32Ne,
}

impl SampleFormat {
    /// Size of one sample in bytes
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S16Ne => 2,
            SampleFormat::ULaw | SampleFormat::ALaw => 1,
            SampleFormat::F32Ne => 4,
        }
    }

    /// Short name, resolved against the build target's endianness
    pub fn name(self) -> &'static str {
        match self {
            #[cfg(target_endian = "little")]
            SampleFormat::S16Ne => "s16le",
            #[cfg(target_endian = "big")]
            SampleFormat::S16Ne => "s16be",
            SampleFormat::ULaw => "ulaw",
            SampleFormat::ALaw => "alaw",
            #[cfg(target_endian = "little")]
            SampleFormat::F32Ne => "float32le",
            #[cfg(target_endian = "big")]
            SampleFormat::F32Ne => "float32be",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Complete description of an interleaved sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpec {
    pub format: SampleFormat,
    pub rate: u32,
    pub channels: u8,
}

impl SampleSpec {
    pub fn new(format: SampleFormat, rate: u32, channels: u8) -> Self {
        Self {
            format,
            rate,
            channels,
        }
    }

    /// Bytes occupied by one frame (one sample per channel)
    pub fn frame_size(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }

    /// Bytes needed for one second of audio
    pub fn bytes_per_second(&self) -> usize {
        self.frame_size() * self.rate as usize
    }

    pub fn is_valid(&self) -> bool {
        self.rate > 0 && self.channels > 0 && self.channels <= CHANNELS_MAX
    }
}

impl fmt::Display for SampleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}ch {}Hz", self.format, self.channels, self.rate)
    }
}

/// Linear playback volume
///
/// `Volume::NORM` (65536) is unity gain. Values above it amplify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Volume(u32);

impl Volume {
    pub const MUTED: Volume = Volume(0);
    pub const NORM: Volume = Volume(0x10000);
    pub const MAX: Volume = Volume(u32::MAX / 2);

    /// Build a volume from a raw value, clamping negatives to silence
    pub fn from_raw(raw: i64) -> Self {
        Volume(raw.clamp(0, Self::MAX.0 as i64) as u32)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Linear gain factor applied to each sample
    pub fn gain(self) -> f32 {
        (self.0 as f64 / Self::NORM.0 as f64) as f32
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::NORM
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.0}%)", self.0, self.gain() * 100.0)
    }
}

impl FromStr for Volume {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Invalid volume '{}'", s)))?;
        Ok(Volume::from_raw(raw))
    }
}

/// Speaker position of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelPosition {
    Mono,
    FrontLeft,
    FrontRight,
    FrontCenter,
    RearCenter,
    RearLeft,
    RearRight,
    Lfe,
    FrontLeftOfCenter,
    FrontRightOfCenter,
    SideLeft,
    SideRight,
    Aux(u8),
    TopCenter,
    TopFrontLeft,
    TopFrontRight,
    TopFrontCenter,
    TopRearLeft,
    TopRearRight,
    TopRearCenter,
}

impl ChannelPosition {
    pub fn name(&self) -> String {
        let name = match self {
            ChannelPosition::Mono => "mono",
            ChannelPosition::FrontLeft => "front-left",
            ChannelPosition::FrontRight => "front-right",
            ChannelPosition::FrontCenter => "front-center",
            ChannelPosition::RearCenter => "rear-center",
            ChannelPosition::RearLeft => "rear-left",
            ChannelPosition::RearRight => "rear-right",
            ChannelPosition::Lfe => "lfe",
            ChannelPosition::FrontLeftOfCenter => "front-left-of-center",
            ChannelPosition::FrontRightOfCenter => "front-right-of-center",
            ChannelPosition::SideLeft => "side-left",
            ChannelPosition::SideRight => "side-right",
            ChannelPosition::Aux(n) => return format!("aux{}", n),
            ChannelPosition::TopCenter => "top-center",
            ChannelPosition::TopFrontLeft => "top-front-left",
            ChannelPosition::TopFrontRight => "top-front-right",
            ChannelPosition::TopFrontCenter => "top-front-center",
            ChannelPosition::TopRearLeft => "top-rear-left",
            ChannelPosition::TopRearRight => "top-rear-right",
            ChannelPosition::TopRearCenter => "top-rear-center",
        };
        name.to_string()
    }
}

impl FromStr for ChannelPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let position = match s {
            "mono" => ChannelPosition::Mono,
            "front-left" | "left" => ChannelPosition::FrontLeft,
            "front-right" | "right" => ChannelPosition::FrontRight,
            "front-center" | "center" => ChannelPosition::FrontCenter,
            "rear-center" => ChannelPosition::RearCenter,
            "rear-left" => ChannelPosition::RearLeft,
            "rear-right" => ChannelPosition::RearRight,
            "lfe" | "subwoofer" => ChannelPosition::Lfe,
            "front-left-of-center" => ChannelPosition::FrontLeftOfCenter,
            "front-right-of-center" => ChannelPosition::FrontRightOfCenter,
            "side-left" => ChannelPosition::SideLeft,
            "side-right" => ChannelPosition::SideRight,
            "top-center" => ChannelPosition::TopCenter,
            "top-front-left" => ChannelPosition::TopFrontLeft,
            "top-front-right" => ChannelPosition::TopFrontRight,
            "top-front-center" => ChannelPosition::TopFrontCenter,
            "top-rear-left" => ChannelPosition::TopRearLeft,
            "top-rear-right" => ChannelPosition::TopRearRight,
            "top-rear-center" => ChannelPosition::TopRearCenter,
            other => {
                let aux = other
                    .strip_prefix("aux")
                    .and_then(|n| n.parse::<u8>().ok())
                    .filter(|n| *n < 32);
                match aux {
                    Some(n) => ChannelPosition::Aux(n),
                    None => {
                        return Err(Error::InvalidInput(format!(
                            "Unknown channel position '{}'",
                            other
                        )))
                    }
                }
            }
        };
        Ok(position)
    }
}

/// Ordered assignment of speaker positions to stream channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    positions: Vec<ChannelPosition>,
}

impl ChannelMap {
    /// Build a map from explicit positions
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty map or more than 32 channels.
    pub fn new(positions: Vec<ChannelPosition>) -> Result<Self> {
        if positions.is_empty() || positions.len() > CHANNELS_MAX as usize {
            return Err(Error::InvalidInput(format!(
                "Channel map must have 1..={} positions, got {}",
                CHANNELS_MAX,
                positions.len()
            )));
        }
        Ok(Self { positions })
    }

    pub fn channels(&self) -> u8 {
        self.positions.len() as u8
    }

    pub fn positions(&self) -> &[ChannelPosition] {
        &self.positions
    }

    /// Whether this map can describe a stream with the given spec
    pub fn is_compatible(&self, spec: &SampleSpec) -> bool {
        self.channels() == spec.channels
    }

    fn standard(name: &str) -> Option<Vec<ChannelPosition>> {
        use ChannelPosition::*;
        let positions = match name {
            "mono" => vec![Mono],
            "stereo" => vec![FrontLeft, FrontRight],
            "surround-21" => vec![FrontLeft, FrontRight, Lfe],
            "surround-40" => vec![FrontLeft, FrontRight, RearLeft, RearRight],
            "surround-41" => vec![FrontLeft, FrontRight, RearLeft, RearRight, Lfe],
            "surround-50" => vec![FrontLeft, FrontRight, RearLeft, RearRight, FrontCenter],
            "surround-51" => vec![
                FrontLeft,
                FrontRight,
                RearLeft,
                RearRight,
                FrontCenter,
                Lfe,
            ],
            "surround-71" => vec![
                FrontLeft,
                FrontRight,
                RearLeft,
                RearRight,
                FrontCenter,
                Lfe,
                SideLeft,
                SideRight,
            ],
            _ => return None,
        };
        Some(positions)
    }
}

impl FromStr for ChannelMap {
    type Err = Error;

    /// Parse either a standard layout name (`stereo`, `surround-51`, ...)
    /// or a comma-separated list of positions.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidInput("Invalid channel map: empty".to_string()));
        }
        if let Some(positions) = Self::standard(s) {
            return Self::new(positions);
        }
        let positions = s
            .split(',')
            .map(|p| p.trim().parse::<ChannelPosition>())
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::InvalidInput(format!("Invalid channel map '{}': {}", s, e)))?;
        Self::new(positions)
    }
}

impl fmt::Display for ChannelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.positions.iter().map(|p| p.name()).collect();
        f.write_str(&names.join(","))
    }
}
