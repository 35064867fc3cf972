//! I2C bus interface.

use thiserror::Error;

use super::Result;

/// Ways a single I2C transaction can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum I2cError {
    /// No device acknowledged the address or a data byte
    #[error("no acknowledge from device")]
    Nack,

    /// Another master won arbitration
    #[error("arbitration lost")]
    ArbitrationLoss,

    /// The bus driver gave up waiting
    #[error("bus timeout")]
    Timeout,

    /// Bus-level failure reported by the adapter
    #[error("bus error: {0}")]
    Bus(String),

    #[error("{0}")]
    Other(String),
}

/// A blocking I2C bus.
///
/// Each method is one bus transaction. `write_read` must issue the write and
/// the read with a repeated start, so a register pointer write followed by a
/// data read counts as a single transaction.
pub trait I2c {
    /// Write `data` to the device at 7-bit address `addr`.
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()>;

    /// Write `write`, then read into `read`, as one transaction.
    fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()>;
}

impl<T: I2c + ?Sized> I2c for &mut T {
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        (**self).write(addr, data)
    }

    fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        (**self).write_read(addr, write, read)
    }
}

#[cfg(test)]
pub mod mock {
    //! Scripted I2C bus for driver tests.

    use std::collections::HashMap;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::{I2c, I2cError};
    use crate::hw_trait::{HwError, Result};

    /// One transaction as seen on the bus.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Transaction {
        Write { addr: u8, data: Vec<u8> },
        WriteRead { addr: u8, write: Vec<u8>, len: usize },
    }

    #[derive(Default)]
    struct State {
        device: u8,
        registers: HashMap<u8, u16>,
        log: Vec<Transaction>,
        fail_with: Option<I2cError>,
        fail_remaining: Option<usize>,
    }

    impl State {
        /// Absent devices NACK their address.
        fn check_address(&self, addr: u8) -> Result<()> {
            if addr == self.device {
                Ok(())
            } else {
                Err(HwError::I2c(I2cError::Nack))
            }
        }

        fn check_failure(&mut self) -> Result<()> {
            let Some(err) = self.fail_with.clone() else {
                return Ok(());
            };
            if let Some(remaining) = self.fail_remaining.as_mut() {
                *remaining -= 1;
                if *remaining == 0 {
                    self.fail_with = None;
                    self.fail_remaining = None;
                }
            }
            Err(HwError::I2c(err))
        }
    }

    /// Bus with one device that serves 16-bit big-endian register contents.
    ///
    /// Clones share state, so a test can keep one handle for inspection
    /// while the driver owns another.
    #[derive(Clone)]
    pub struct MockI2c {
        state: Arc<Mutex<State>>,
    }

    impl MockI2c {
        /// A bus with the device at 0x40.
        pub fn new() -> Self {
            Self::at(0x40)
        }

        /// A bus with the device at `device`.
        pub fn at(device: u8) -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    device,
                    ..State::default()
                })),
            }
        }

        pub fn set_register(&self, reg: u8, value: u16) {
            self.state.lock().registers.insert(reg, value);
        }

        pub fn register(&self, reg: u8) -> Option<u16> {
            self.state.lock().registers.get(&reg).copied()
        }

        /// Make every following transaction fail with `error`.
        pub fn fail_with(&self, error: I2cError) {
            let mut state = self.state.lock();
            state.fail_with = Some(error);
            state.fail_remaining = None;
        }

        /// Fail only the next `count` transactions.
        pub fn fail_next(&self, error: I2cError, count: usize) {
            let mut state = self.state.lock();
            state.fail_with = (count > 0).then_some(error);
            state.fail_remaining = (count > 0).then_some(count);
        }

        pub fn recover(&self) {
            let mut state = self.state.lock();
            state.fail_with = None;
            state.fail_remaining = None;
        }

        pub fn transactions(&self) -> Vec<Transaction> {
            self.state.lock().log.clone()
        }

        pub fn transaction_count(&self) -> usize {
            self.state.lock().log.len()
        }
    }

    impl I2c for MockI2c {
        fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
            let mut state = self.state.lock();
            state.log.push(Transaction::Write { addr, data: data.to_vec() });
            state.check_address(addr)?;
            state.check_failure()?;
            if let &[reg, hi, lo] = data {
                state.registers.insert(reg, u16::from_be_bytes([hi, lo]));
            }
            Ok(())
        }

        fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
            let mut state = self.state.lock();
            state.log.push(Transaction::WriteRead {
                addr,
                write: write.to_vec(),
                len: read.len(),
            });
            state.check_address(addr)?;
            state.check_failure()?;
            let reg = write.first().copied().ok_or_else(|| {
                HwError::I2c(I2cError::Other("empty register pointer".into()))
            })?;
            let value = state
                .registers
                .get(&reg)
                .copied()
                .ok_or(HwError::I2c(I2cError::Nack))?;
            let bytes = value.to_be_bytes();
            for (dst, src) in read.iter_mut().zip(bytes.iter()) {
                *dst = *src;
            }
            Ok(())
        }
    }
}
