//! Hardware abstraction layer traits.
//!
//! This module defines the hardware interface traits that allow drivers to
//! work with different underlying implementations, whether direct Linux
//! hardware access or a scripted bus under test.

use thiserror::Error;

pub mod i2c;
pub mod linux;

use i2c::I2cError;

/// Errors raised by hardware access or by drivers built on it.
#[derive(Error, Debug)]
pub enum HwError {
    /// A bus transaction failed
    #[error("I2C error: {0}")]
    I2c(#[from] I2cError),

    /// A caller-supplied or device-reported value was out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Opening or configuring the underlying device failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for hardware Results.
pub type Result<T> = std::result::Result<T, HwError>;
