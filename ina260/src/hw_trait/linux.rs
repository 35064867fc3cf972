//! I2C access through the Linux i2c-dev interface.
//!
//! Wraps `linux_embedded_hal::I2cdev`. Its `write_read` issues the register
//! pointer write and the data read as one `I2C_RDWR` transfer with a
//! repeated start in between.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use embedded_hal::i2c::{Error as _, ErrorKind, I2c as HalI2c};
use linux_embedded_hal::I2cdev;

use super::i2c::{I2c, I2cError};
use super::{HwError, Result};
use crate::tracing::prelude::*;

/// An open `/dev/i2c-N` adapter.
pub struct LinuxI2c {
    dev: I2cdev,
    path: PathBuf,
}

impl LinuxI2c {
    /// Open the adapter at `path`, e.g. `/dev/i2c-1`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dev = I2cdev::new(&path).map_err(|e| {
            HwError::Io(std::io::Error::other(format!("{}: {}", path.display(), e)))
        })?;
        debug!(path = %path.display(), "Opened I2C adapter");
        Ok(Self { dev, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Map an embedded-hal error kind onto a transaction failure.
fn classify(kind: ErrorKind, detail: impl Display) -> I2cError {
    match kind {
        ErrorKind::NoAcknowledge(_) => I2cError::Nack,
        ErrorKind::ArbitrationLoss => I2cError::ArbitrationLoss,
        ErrorKind::Bus | ErrorKind::Overrun => I2cError::Bus(detail.to_string()),
        _ => I2cError::Other(detail.to_string()),
    }
}

fn bus_error(e: linux_embedded_hal::I2CError) -> HwError {
    HwError::I2c(classify(e.kind(), &e))
}

impl I2c for LinuxI2c {
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        HalI2c::write(&mut self.dev, addr, data).map_err(bus_error)
    }

    fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        HalI2c::write_read(&mut self.dev, addr, write, read).map_err(bus_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::NoAcknowledgeSource;
    use test_case::test_case;

    #[test_case(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address), I2cError::Nack; "address nack")]
    #[test_case(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data), I2cError::Nack; "data nack")]
    #[test_case(ErrorKind::ArbitrationLoss, I2cError::ArbitrationLoss; "arbitration")]
    #[test_case(ErrorKind::Bus, I2cError::Bus("EIO".into()); "bus")]
    #[test_case(ErrorKind::Other, I2cError::Other("EIO".into()); "other")]
    fn error_kind_classification(kind: ErrorKind, expected: I2cError) {
        assert_eq!(classify(kind, "EIO"), expected);
    }

    #[test]
    fn open_missing_adapter_fails_with_io() {
        let result = LinuxI2c::open("/dev/i2c-does-not-exist");
        assert!(matches!(result, Err(HwError::Io(_))));
    }
}
