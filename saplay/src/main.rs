//! saplay - Main entry point
//!
//! Parses the command line, loads the configuration, sets up logging and
//! runs the player on a single-threaded runtime until it asks to exit.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::{debug, info};

use saplay::cli::Cli;
use saplay::config::Settings;
use saplay::event_loop::{forward_interrupts, EventLoop, TICK_PERIOD};
use saplay::logging;
use saplay::playback::{Connection, Player, Scheduler};
use saplay::transport::CpalTransport;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(cli) {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(e) => {
            eprintln!("saplay: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let settings = Settings::load(&cli).context("Failed to load configuration")?;

    logging::init_logging(settings.verbose, &settings.logging)?;

    info!(
        "saplay {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );
    for (index, slot) in settings.slots.iter().enumerate() {
        debug!("Slot {}: {}", index, slot.path.display());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    Ok(runtime.block_on(play(settings)))
}

async fn play(settings: Settings) -> i32 {
    let (event_loop, events) = EventLoop::new(TICK_PERIOD);
    let _signals = forward_interrupts(events.clone());

    let connection = Connection::new(
        CpalTransport::new(events),
        settings.server.clone(),
        settings.client_name.clone(),
    );
    let scheduler = Scheduler::new(settings.slots.clone());
    let mut player = Player::new(connection, scheduler, settings.player_options());

    event_loop.run(&mut player).await
}
