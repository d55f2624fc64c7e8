//! Event loop tests with virtual time
//!
//! The mock transport answers every request on its own, so these tests
//! exercise the real dispatch path: connect, first start on the first tick,
//! write requests until end of file, drain, restart on later ticks, and
//! exit codes.

mod helpers;

use helpers::{generate_float_wav, generate_pcm_wav, MockTransport};
use saplay::config::SlotConfig;
use saplay::event_loop::{EventLoop, TICK_PERIOD};
use saplay::playback::{Connection, Player, PlayerOptions, Scheduler};
use std::time::Duration;
use tempfile::TempDir;

fn player(transport: MockTransport, slots: Vec<SlotConfig>) -> Player<MockTransport> {
    let connection = Connection::new(transport, Some("mock".into()), "loop-test".into());
    Player::new(connection, Scheduler::new(slots), PlayerOptions::default())
}

#[tokio::test(start_paused = true)]
async fn test_slots_loop_until_interrupted() {
    let dir = TempDir::new().unwrap();
    let pcm = generate_pcm_wav(dir.path().join("left.wav"), 8000, 2, 800).unwrap();
    let float = generate_float_wav(dir.path().join("right.wav"), 8000, 1, 500).unwrap();

    let (event_loop, events) = EventLoop::new(TICK_PERIOD);
    let mut player = player(
        MockTransport::auto(events.clone()),
        vec![SlotConfig::new(&pcm.path), SlotConfig::new(&float.path)],
    );

    let interrupter = events.clone();
    tokio::spawn(async move {
        tokio::time::sleep(TICK_PERIOD * 3 + TICK_PERIOD / 2).await;
        interrupter.interrupt();
    });

    let code = event_loop.run(&mut player).await;
    assert_eq!(code, 0);

    let transport = player.connection().transport();
    assert!(transport.disconnected());

    for slot in 0..2 {
        let plays = player.scheduler().slots()[slot]
            .stream()
            .expect("Slot should have been opened")
            .plays_completed();
        assert!(plays >= 2, "slot {} played {} times", slot, plays);
    }

    // Every completed play pushed the whole file
    for handle in transport.released() {
        let written = transport.bytes_written(handle);
        let spec = transport.spec_of(handle).unwrap();
        let expected = if spec.channels == 2 {
            pcm.transport_bytes(2)
        } else {
            float.transport_bytes(4)
        };
        assert_eq!(written, expected, "stream {}", handle);
    }
}

#[tokio::test(start_paused = true)]
async fn test_nothing_starts_before_first_tick() {
    let dir = TempDir::new().unwrap();
    let pcm = generate_pcm_wav(dir.path().join("a.wav"), 8000, 1, 100).unwrap();

    let (event_loop, events) = EventLoop::new(TICK_PERIOD);
    let mut player = player(MockTransport::auto(events.clone()), vec![SlotConfig::new(&pcm.path)]);

    // Interrupt lands before the first tick, after the connection is ready
    let interrupter = events.clone();
    tokio::spawn(async move {
        tokio::time::sleep(TICK_PERIOD / 2).await;
        interrupter.interrupt();
    });

    let code = event_loop.run(&mut player).await;
    assert_eq!(code, 0);
    assert!(player.connection().transport().created().is_empty());
    assert!(!player.scheduler().first_start_done());
}

#[tokio::test(start_paused = true)]
async fn test_connection_failure_exits_1() {
    let dir = TempDir::new().unwrap();
    let pcm = generate_pcm_wav(dir.path().join("a.wav"), 8000, 1, 100).unwrap();

    let (event_loop, events) = EventLoop::new(TICK_PERIOD);
    let mut transport = MockTransport::auto(events);
    transport.fail_connection = true;
    let mut player = player(transport, vec![SlotConfig::new(&pcm.path)]);

    let code = event_loop.run(&mut player).await;
    assert_eq!(code, 1);
    assert!(player.connection().transport().created().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_all_slots_failing_exits_1() {
    let dir = TempDir::new().unwrap();
    let a = generate_pcm_wav(dir.path().join("a.wav"), 8000, 1, 100).unwrap();
    let b = generate_pcm_wav(dir.path().join("b.wav"), 8000, 1, 100).unwrap();

    let (event_loop, events) = EventLoop::new(TICK_PERIOD);
    let mut transport = MockTransport::auto(events);
    transport.fail_drain = true;
    let mut player = player(
        transport,
        vec![SlotConfig::new(&a.path), SlotConfig::new(&b.path)],
    );

    let code = tokio::time::timeout(Duration::from_secs(5), event_loop.run(&mut player))
        .await
        .expect("Loop should exit once every slot has failed");
    assert_eq!(code, 1);
    assert!(player.scheduler().all_failed());
}
