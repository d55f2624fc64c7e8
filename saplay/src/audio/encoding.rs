//! Source-encoding classification
//!
//! Maps what a container says about its samples onto the four sample
//! formats the transport accepts, and decides whether reads go through the
//! decoder (frame reads) or copy the container's bytes untouched (raw reads).

use saplay_common::SampleFormat;
use symphonia::core::codecs::{
    CodecParameters, CODEC_TYPE_FLAC, CODEC_TYPE_PCM_ALAW, CODEC_TYPE_PCM_F32BE,
    CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_F64BE, CODEC_TYPE_PCM_F64LE, CODEC_TYPE_PCM_MULAW,
    CODEC_TYPE_PCM_S16BE, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_S8, CODEC_TYPE_PCM_U8,
};

/// Sample encoding stored in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    PcmS16,
    PcmU8,
    PcmS8,
    ULaw,
    ALaw,
    Float,
    Double,
    /// Anything else (24/32-bit PCM, lossy codecs, ...)
    Other,
}

/// How bytes are pulled from an open decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Decode whole frames into the transport sample format
    Frames,
    /// Copy encoded bytes straight from the container
    Raw,
}

impl SourceEncoding {
    /// Classify a track from its codec parameters
    pub fn from_codec_params(params: &CodecParameters) -> Self {
        match params.codec {
            CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => SourceEncoding::PcmS16,
            CODEC_TYPE_PCM_U8 => SourceEncoding::PcmU8,
            CODEC_TYPE_PCM_S8 => SourceEncoding::PcmS8,
            CODEC_TYPE_PCM_MULAW => SourceEncoding::ULaw,
            CODEC_TYPE_PCM_ALAW => SourceEncoding::ALaw,
            CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => SourceEncoding::Float,
            CODEC_TYPE_PCM_F64LE | CODEC_TYPE_PCM_F64BE => SourceEncoding::Double,
            // Lossless containers report their PCM depth separately
            CODEC_TYPE_FLAC => match params.bits_per_sample {
                Some(16) => SourceEncoding::PcmS16,
                Some(8) => SourceEncoding::PcmS8,
                _ => SourceEncoding::Other,
            },
            _ => SourceEncoding::Other,
        }
    }

    /// Transport sample format this encoding is played as
    pub fn transport_format(self) -> SampleFormat {
        match self {
            SourceEncoding::PcmS16 | SourceEncoding::PcmU8 | SourceEncoding::PcmS8 => {
                SampleFormat::S16Ne
            }
            SourceEncoding::ULaw => SampleFormat::ULaw,
            SourceEncoding::ALaw => SampleFormat::ALaw,
            SourceEncoding::Float | SourceEncoding::Double | SourceEncoding::Other => {
                SampleFormat::F32Ne
            }
        }
    }

    pub fn read_mode(self) -> ReadMode {
        match self {
            SourceEncoding::ULaw | SourceEncoding::ALaw => ReadMode::Raw,
            _ => ReadMode::Frames,
        }
    }
}
