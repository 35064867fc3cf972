//! Driver and monitoring tools for the TI INA260 current and power sensor.

pub mod config;
pub mod error;
pub mod hw_trait;
pub mod monitor;
pub mod peripheral;
pub mod tracing;
