//! Test helper modules for saplay integration tests
//!
//! Provides reusable test infrastructure components:
//! - audio_generator: deterministic WAV files (hound, plus hand-built G.711)
//! - mock_transport: scripted Transport that records every call

#![allow(dead_code)]

pub mod audio_generator;
pub mod mock_transport;

pub use audio_generator::{
    counting_bytes, generate_float_wav, generate_g711_wav, generate_pcm_wav, G711Law, WavFixture,
};
pub use mock_transport::{Call, MockTransport};
