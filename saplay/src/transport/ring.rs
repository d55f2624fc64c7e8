//! Lock-free sample ring between the event loop and the output callback
//!
//! - Producer (event loop thread): converted f32 samples from `write()`
//! - Consumer (audio callback): pulls samples without taking any lock
//!
//! Besides the samples themselves, the two halves share a few flags used
//! to turn buffer levels into transport events: the consumer asks for more
//! data once half the ring is free, and reports the end of a drain once the
//! ring has run dry.

use ringbuf::{traits::*, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Flags shared by both halves of one ring
#[derive(Debug, Default)]
pub struct RingSignals {
    /// A write request is outstanding; cleared by the producer on write
    write_requested: AtomicBool,
    /// The producer asked for a drain
    draining: AtomicBool,
    /// Drain completion was already reported
    drain_reported: AtomicBool,
    /// Callback found fewer samples than it needed
    underruns: AtomicU64,
    /// Producer had more samples than room
    overruns: AtomicU64,
}

/// What the consumer wants the loop to hear after a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingNotice {
    /// Free space (in samples) worth refilling
    WriteReady(usize),
    DrainComplete,
}

/// Sample ring for one output stream
pub struct SampleRing {
    buffer: HeapRb<f32>,
    signals: Arc<RingSignals>,
}

impl SampleRing {
    /// Create a ring holding `capacity` samples (not frames)
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: HeapRb::new(capacity.max(1)),
            signals: Arc::new(RingSignals::default()),
        }
    }

    /// Split into producer and consumer halves
    pub fn split(self) -> (SampleProducer, SampleConsumer) {
        let capacity = self.buffer.capacity().get();
        let (prod, cons) = self.buffer.split();

        let producer = SampleProducer {
            producer: prod,
            signals: Arc::clone(&self.signals),
        };
        let consumer = SampleConsumer {
            consumer: cons,
            signals: self.signals,
            low_water: capacity / 2,
        };
        (producer, consumer)
    }
}

/// Producer half, owned by the transport on the event loop thread
pub struct SampleProducer {
    producer: ringbuf::HeapProd<f32>,
    signals: Arc<RingSignals>,
}

impl SampleProducer {
    /// Push samples, returning how many fit
    pub fn push(&mut self, samples: &[f32]) -> usize {
        self.signals.write_requested.store(false, Ordering::Release);
        let pushed = self.producer.push_slice(samples);
        if pushed < samples.len() {
            self.signals.overruns.fetch_add(1, Ordering::Relaxed);
        }
        pushed
    }

    /// Request a drain; completion is reported once the ring is empty
    pub fn begin_drain(&self) {
        self.signals.drain_reported.store(false, Ordering::Release);
        self.signals.draining.store(true, Ordering::Release);
    }

    pub fn is_draining(&self) -> bool {
        self.signals.draining.load(Ordering::Acquire)
    }

    pub fn underruns(&self) -> u64 {
        self.signals.underruns.load(Ordering::Relaxed)
    }

    pub fn overruns(&self) -> u64 {
        self.signals.overruns.load(Ordering::Relaxed)
    }
}

/// Consumer half, moved into the audio callback
pub struct SampleConsumer {
    consumer: ringbuf::HeapCons<f32>,
    signals: Arc<RingSignals>,
    low_water: usize,
}

impl SampleConsumer {
    /// Fill `out` with samples, padding with silence on underrun
    ///
    /// `convert` maps each f32 sample into the device sample type.
    pub fn fill<S, F>(&mut self, out: &mut [S], mut convert: F)
    where
        F: FnMut(f32) -> S,
    {
        let mut short = false;
        for slot in out.iter_mut() {
            let sample = match self.consumer.try_pop() {
                Some(sample) => sample,
                None => {
                    short = true;
                    0.0
                }
            };
            *slot = convert(sample);
        }
        if short && !self.signals.draining.load(Ordering::Acquire) {
            self.signals.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Decide whether the loop should be told something after a callback
    ///
    /// Each notice is raised at most once until the producer reacts to it.
    pub fn notice(&self) -> Option<RingNotice> {
        if self.signals.draining.load(Ordering::Acquire) {
            if self.consumer.is_empty() && !self.signals.drain_reported.swap(true, Ordering::AcqRel)
            {
                return Some(RingNotice::DrainComplete);
            }
            return None;
        }

        let vacant = self.consumer.vacant_len();
        if vacant >= self.low_water && !self.signals.write_requested.swap(true, Ordering::AcqRel) {
            return Some(RingNotice::WriteReady(vacant));
        }
        None
    }
}
