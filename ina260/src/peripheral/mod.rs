//! Peripheral chip drivers.
//!
//! Drivers are generic over the hw_trait interfaces, so they run against
//! Linux i2c-dev adapters as well as scripted buses under test.

pub mod ina260;
