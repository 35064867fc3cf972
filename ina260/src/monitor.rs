//! Periodic sampling of an INA260.
//!
//! The driver blocks for the length of each bus transaction, so reads run on
//! tokio's blocking pool and the polling loop itself stays async. Readings
//! are forwarded over a channel; a failed read is logged and skipped, and
//! the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::hw_trait::i2c::I2c;
use crate::peripheral::ina260::{Ina260, Measurement};
use crate::tracing::prelude::*;

/// A sensor handle shared between the poller and other users of the bus.
pub type SharedSensor<I> = Arc<Mutex<Ina260<I>>>;

/// Take one measurement without blocking the async runtime.
pub async fn sample<I>(sensor: SharedSensor<I>) -> crate::error::Result<Measurement>
where
    I: I2c + Send + 'static,
{
    let reading = tokio::task::spawn_blocking(move || sensor.lock().read_measurement()).await?;
    Ok(reading?)
}

/// Poll `sensor` every `interval` until `running` is cancelled or the
/// receiving side of `readings` goes away.
pub async fn task<I>(
    sensor: SharedSensor<I>,
    interval: Duration,
    running: CancellationToken,
    readings: mpsc::Sender<Measurement>,
) where
    I: I2c + Send + 'static,
{
    trace!("Task started.");

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = running.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match sample(sensor.clone()).await {
            Ok(measurement) => {
                if readings.send(measurement).await.is_err() {
                    debug!("Reading consumer closed, stopping monitor.");
                    break;
                }
            }
            Err(e) => {
                error!("INA260 read failed: {}", e);
            }
        }
    }

    trace!("Task stopped.");
}
