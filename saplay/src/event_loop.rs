//! Single-threaded event loop
//!
//! Owns the only thread of control. Transport events and interrupts arrive
//! on one unbounded channel; a fixed-period ticker drives the scheduler.
//! Each wakeup dispatches exactly one handler on the [`Player`] and runs it
//! to completion before waiting again. After every dispatch the loop checks
//! whether the player has asked to quit.

use crate::playback::Player;
use crate::transport::{Transport, TransportEvent};
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

/// Scheduler tick period
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// Everything the loop can be woken up for, apart from the tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    Transport(TransportEvent),
    /// Interactive interrupt or termination request
    Interrupt,
}

/// Cloneable handle for posting events into the loop
///
/// Safe to use from any thread, including audio callbacks.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<LoopEvent>,
}

impl EventSender {
    /// Post a transport event. Returns false once the loop is gone.
    pub fn transport(&self, event: TransportEvent) -> bool {
        self.tx.send(LoopEvent::Transport(event)).is_ok()
    }

    /// Post an interrupt. Returns false once the loop is gone.
    pub fn interrupt(&self) -> bool {
        self.tx.send(LoopEvent::Interrupt).is_ok()
    }
}

/// The dispatcher
pub struct EventLoop {
    rx: mpsc::UnboundedReceiver<LoopEvent>,
    period: Duration,
}

impl EventLoop {
    /// Create a loop ticking every `period`, plus the sender feeding it
    pub fn new(period: Duration) -> (Self, EventSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, period }, EventSender { tx })
    }

    /// Run until the player requests an exit
    ///
    /// Starts the player (which begins connecting), then dispatches events
    /// and ticks. The first tick fires one period after start.
    ///
    /// # Returns
    /// The exit code passed to the player's first `quit()`.
    pub async fn run<T: Transport>(mut self, player: &mut Player<T>) -> i32 {
        player.start();
        if let Some(code) = player.exit_code() {
            player.teardown();
            return code;
        }

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("Event loop running (tick period {:?})", self.period);

        let code = loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(LoopEvent::Transport(event)) => {
                        trace!("Dispatching {:?}", event);
                        player.on_transport_event(event);
                    }
                    Some(LoopEvent::Interrupt) => player.on_interrupt(),
                    None => {
                        debug!("Event channel closed");
                        player.quit(0);
                    }
                },
                _ = ticker.tick() => player.on_tick(),
            }

            if let Some(code) = player.exit_code() {
                break code;
            }
        };

        debug!("Event loop finished with exit code {}", code);
        player.teardown();
        code
    }
}

/// Forward SIGINT (and SIGTERM on unix) into the loop as interrupts
///
/// Keeps listening after the first signal so a second one can force an
/// immediate exit.
pub fn forward_interrupts(events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut terminate =
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(stream) => Some(stream),
                Err(e) => {
                    error!("Failed to install terminate signal handler: {}", e);
                    None
                }
            };

        loop {
            #[cfg(unix)]
            let terminated = async {
                if let Some(stream) = terminate.as_mut() {
                    if stream.recv().await.is_some() {
                        return;
                    }
                }
                std::future::pending::<()>().await
            };

            #[cfg(not(unix))]
            let terminated = std::future::pending::<()>();

            tokio::select! {
                result = signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("Failed to install Ctrl+C handler: {}", e);
                        return;
                    }
                    info!("Received Ctrl+C");
                },
                _ = terminated => {
                    info!("Received terminate signal");
                },
            }

            if !events.interrupt() {
                break;
            }
        }
    })
}
