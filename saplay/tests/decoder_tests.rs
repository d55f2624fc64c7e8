//! Decoder adapter tests against generated WAV files
//!
//! Covers:
//! - Transport spec reported for 16-bit, 8-bit and float sources
//! - Whole-frame reads, short read at end of file, zero after
//! - Raw G.711 reads return the data chunk untouched
//! - Idempotent close

mod helpers;

use helpers::{counting_bytes, generate_float_wav, generate_g711_wav, generate_pcm_wav, G711Law};
use hound::{WavSpec, WavWriter};
use saplay::audio::{DecoderAdapter, ReadMode, SourceEncoding};
use saplay::Error;
use saplay_common::{SampleFormat, SampleSpec};
use std::f32::consts::PI;
use tempfile::TempDir;

#[test]
fn test_pcm16_reads_whole_frames_then_short_read() {
    let dir = TempDir::new().unwrap();
    let fixture = generate_pcm_wav(dir.path().join("tone.wav"), 8000, 2, 1000).unwrap();

    let mut decoder = DecoderAdapter::open(&fixture.path).expect("Should open 16-bit WAV");
    assert_eq!(decoder.info().encoding, SourceEncoding::PcmS16);
    assert_eq!(
        decoder.sample_spec(),
        SampleSpec::new(SampleFormat::S16Ne, 8000, 2)
    );
    assert_eq!(decoder.read_mode(), ReadMode::Frames);

    let (bytes, frames) = decoder.read_frames(600);
    assert_eq!(frames, 600);
    assert_eq!(bytes.len(), 600 * 4);

    let (bytes, frames) = decoder.read_frames(600);
    assert_eq!(frames, 400, "Short read marks the end of the file");
    assert_eq!(bytes.len(), 400 * 4);

    let (bytes, frames) = decoder.read_frames(600);
    assert_eq!(frames, 0);
    assert!(bytes.is_empty());
}

#[test]
fn test_float_source_maps_to_f32() {
    let dir = TempDir::new().unwrap();
    let fixture = generate_float_wav(dir.path().join("float.wav"), 16000, 1, 64).unwrap();

    let mut decoder = DecoderAdapter::open(&fixture.path).expect("Should open float WAV");
    assert_eq!(decoder.info().encoding, SourceEncoding::Float);
    assert_eq!(
        decoder.sample_spec(),
        SampleSpec::new(SampleFormat::F32Ne, 16000, 1)
    );

    let (bytes, frames) = decoder.read_frames(64);
    assert_eq!(frames, 64);

    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let expected = (2.0 * PI * 440.0 * 5.0 / 16000.0).sin() * 0.5;
    assert!((samples[5] - expected).abs() < 1e-6);
}

#[test]
fn test_eight_bit_source_maps_to_s16() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("u8.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..100i32 {
        writer.write_sample((i % 50) as i8).unwrap();
    }
    writer.finalize().unwrap();

    let mut decoder = DecoderAdapter::open(&path).expect("Should open 8-bit WAV");
    assert_eq!(decoder.info().encoding, SourceEncoding::PcmU8);
    assert_eq!(decoder.sample_spec().format, SampleFormat::S16Ne);

    let (bytes, frames) = decoder.read_frames(1000);
    assert_eq!(frames, 100);
    assert_eq!(bytes.len(), 200);
}

#[test]
fn test_close_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let fixture = generate_pcm_wav(dir.path().join("short.wav"), 8000, 1, 10).unwrap();

    let mut decoder = DecoderAdapter::open(&fixture.path).unwrap();
    assert!(!decoder.is_closed());

    decoder.close();
    decoder.close();
    assert!(decoder.is_closed());

    let (bytes, frames) = decoder.read_frames(10);
    assert_eq!(frames, 0, "A closed decoder reads nothing");
    assert!(bytes.is_empty());
}

#[test]
fn test_directory_is_not_a_sound_file() {
    let dir = TempDir::new().unwrap();
    let result = DecoderAdapter::open(dir.path());
    assert!(matches!(result, Err(Error::OpenFailed { .. })));
}

#[test]
fn test_ulaw_raw_reads_return_container_bytes() {
    let dir = TempDir::new().unwrap();
    let data = counting_bytes(3000);
    let fixture =
        generate_g711_wav(dir.path().join("prompt.wav"), G711Law::ULaw, 8000, &data).unwrap();

    let mut decoder = DecoderAdapter::open(&fixture.path).expect("Should open u-law WAV");
    assert_eq!(decoder.info().encoding, SourceEncoding::ULaw);
    assert_eq!(
        decoder.sample_spec(),
        SampleSpec::new(SampleFormat::ULaw, 8000, 1)
    );
    assert_eq!(decoder.read_mode(), ReadMode::Raw);

    let first = decoder.read_raw(1024);
    let second = decoder.read_raw(1024);
    assert_eq!(first, &data[..1024]);
    assert_eq!(second, &data[1024..2048]);

    let tail = decoder.read_raw(1024);
    assert_eq!(tail.len(), 952, "Short read marks the end of the file");
    assert_eq!(tail, &data[2048..]);

    assert!(decoder.read_raw(1024).is_empty());
}

#[test]
fn test_alaw_raw_read_whole_file() {
    let dir = TempDir::new().unwrap();
    let data: Vec<u8> = counting_bytes(500).into_iter().map(|b| b ^ 0x55).collect();
    let fixture =
        generate_g711_wav(dir.path().join("alaw.wav"), G711Law::ALaw, 8000, &data).unwrap();

    let mut decoder = DecoderAdapter::open(&fixture.path).expect("Should open A-law WAV");
    assert_eq!(decoder.info().encoding, SourceEncoding::ALaw);
    assert_eq!(decoder.sample_spec().format, SampleFormat::ALaw);
    assert_eq!(decoder.read_mode(), ReadMode::Raw);

    assert_eq!(decoder.read_raw(4096), data);
    assert!(decoder.read_raw(4096).is_empty());
}
