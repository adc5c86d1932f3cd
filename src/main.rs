//! # ESC Driver
//!
//! Drive a brushless ESC with PWM or DShot behind a safety-gated control
//! surface.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (defaults if the file is absent)
//!    - Set up logging with tracing subscriber
//!    - Restore pin, protocol and direction from the settings store
//!
//! 2. **Main Loop**
//!    - Tick the control loop at the configured rate (50Hz by default)
//!    - Serve JSON-lines requests from stdin, responses on stdout
//!    - Handle Ctrl+C for graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Disarm (output pin driven LOW)
//!    - Log total frame count
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/esc-driver.toml
//! {"cmd":"configure","protocol":"DSHOT300"}
//! {"cmd":"arm"}
//! {"cmd":"set_throttle","value":400}
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::BufReader;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use esc_driver::api::{self, lock, SharedEsc};
use esc_driver::config::{Config, LoggingConfig};
use esc_driver::control_loop::ControlLoop;
use esc_driver::esc::controller::EscController;
use esc_driver::hal::sim::{SimulatedGpio, SpinDelay};
use esc_driver::hal::Pin;
use esc_driver::store::TomlFileStore;
use esc_driver::transmitter::SignalTransmitter;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/esc-driver.toml";

/// Log file name prefix inside the configured log directory
const LOG_FILE_PREFIX: &str = "esc-driver.log";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config_found = Path::new(&config_path).exists();
    let config = if config_found {
        Config::load(&config_path).with_context(|| format!("Failed to load {}", config_path))?
    } else {
        Config::default()
    };

    let _log_guard = init_logging(&config.logging)?;

    info!("ESC Driver v{} starting...", env!("CARGO_PKG_VERSION"));
    if config_found {
        info!("Loaded configuration from {}", config_path);
    } else {
        warn!("No configuration at {}, using defaults", config_path);
    }

    let store = TomlFileStore::open(&config.store.path);
    let transmitter = SignalTransmitter::new(SimulatedGpio::new(), SpinDelay::new());
    let esc = EscController::new(
        transmitter,
        store,
        &config.esc,
        config.commands.repeat_policy(),
    );
    let esc: SharedEsc<_, _, _> = Arc::new(Mutex::new(esc));

    let mut session = tokio::spawn(api::serve(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        esc.clone(),
    ));
    let mut session_open = true;

    let mut control = ControlLoop::new(config.control.period());
    let mut ticker = interval(control.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Starting control loop at {}Hz", config.control.loop_rate_hz);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tokio::task::block_in_place(|| {
                    let mut esc = lock(&esc);
                    control.tick(&mut *esc);
                });
            }

            result = &mut session, if session_open => {
                session_open = false;
                match result {
                    Ok(Ok(())) => info!("Command input closed, control loop keeps running"),
                    Ok(Err(e)) => warn!("Command session ended: {}", e),
                    Err(e) => error!("Command session task failed: {}", e),
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    session.abort();

    let mut esc = lock(&esc);
    esc.disarm();

    let status = esc.status();
    if let Ok(pin) = Pin::new(i64::from(status.pin)) {
        info!(
            "{} emitted {} pulses",
            pin,
            esc.transmitter().gpio().rising_edges(pin)
        );
    }
    info!("Total frames sent: {} over {} ticks", control.frames(), control.ticks());

    Ok(())
}

/// Install the tracing subscriber
///
/// Logs go to stderr (stdout carries responses), plus a daily-rolling file
/// when a log directory is configured.
///
/// # Returns
///
/// * `Option<WorkerGuard>` - Guard that flushes the file writer on drop
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: tracing::Level = config
        .level
        .parse()
        .with_context(|| format!("Invalid log level {}", config.level))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if config.directory.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(Some(guard))
}
