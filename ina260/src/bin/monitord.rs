//! Continuous INA260 monitor.
//!
//! Prints one line per sample in the form `<current>mA,  <voltage>V,
//! <power>mW` until SIGINT or SIGTERM. Settings come from the environment
//! (see `ina260::config`), or from a JSON file given as the only argument.

use std::env;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::signal::unix::{self, SignalKind};
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use ina260::config::Config;
use ina260::hw_trait::linux::LinuxI2c;
use ina260::monitor;
use ina260::peripheral::ina260::Ina260;
use ina260::tracing::{self, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing::init_journald_or_stdout();

    let config = match env::args().nth(1) {
        Some(path) => Config::load_from(Path::new(&path))?,
        None => Config::from_env()?,
    };

    let bus = LinuxI2c::open(&config.bus)?;
    let mut sensor = Ina260::new_with_address(bus, config.address)?;
    if let Err(e) = sensor.verify_identity() {
        warn!("Identity check failed, continuing anyway: {}", e);
    }
    let sensor = Arc::new(Mutex::new(sensor));

    let running = CancellationToken::new();
    let tracker = TaskTracker::new();
    let (tx, mut rx) = mpsc::channel(16);
    tracker.spawn(monitor::task(
        sensor,
        config.interval(),
        running.clone(),
        tx,
    ));
    tracker.spawn(async move {
        while let Some(measurement) = rx.recv().await {
            println!("{}", measurement);
        }
    });
    tracker.close();
    info!(
        bus = %config.bus.display(),
        address = format!("{:#04x}", config.address),
        interval_ms = config.interval_ms,
        "Started."
    );

    let mut sigint = unix::signal(SignalKind::interrupt())?;
    let mut sigterm = unix::signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT");
        },
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        },
    }

    trace!("Shutting down.");
    running.cancel();

    tracker.wait().await;
    info!("Exiting.");

    Ok(())
}
