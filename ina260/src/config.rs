//! Configuration management for the INA260 tools.
//!
//! Settings come from built-in defaults, optionally a JSON file, and then
//! environment variables, in that order of increasing precedence.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::peripheral::ina260;

/// Environment variable naming the I2C adapter device
pub const ENV_BUS: &str = "INA260_I2C_BUS";
/// Environment variable holding the sensor address
pub const ENV_ADDRESS: &str = "INA260_ADDRESS";
/// Environment variable holding the poll interval in milliseconds
pub const ENV_INTERVAL_MS: &str = "INA260_INTERVAL_MS";

const DEFAULT_BUS: &str = "/dev/i2c-1";
const DEFAULT_INTERVAL_MS: u64 = 100;

/// Where to find the sensor and how often to poll it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// I2C adapter device path
    pub bus: PathBuf,

    /// 7-bit sensor address
    pub address: u8,

    /// Poll interval for the monitor, in milliseconds
    pub interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: PathBuf::from(DEFAULT_BUS),
            address: ina260::DEFAULT_ADDRESS,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Defaults overridden by the environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Load configuration from a JSON file, then apply the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides looked up by variable name and validate the result.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bus) = lookup(ENV_BUS) {
            self.bus = PathBuf::from(bus);
        }
        if let Some(address) = lookup(ENV_ADDRESS) {
            self.address = parse_address(&address)?;
        }
        if let Some(interval) = lookup(ENV_INTERVAL_MS) {
            self.interval_ms = interval.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a whole number of milliseconds", ENV_INTERVAL_MS))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        ina260::check_address(self.address)?;
        if self.interval_ms == 0 {
            return Err(Error::Config("poll interval must be non-zero".into()));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Parse an address written as hex (`0x41`) or decimal (`65`).
pub fn parse_address(text: &str) -> Result<u8> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| Error::Config(format!("invalid I2C address: {:?}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_example_wiring() {
        let config = Config::default();
        assert_eq!(config.bus, PathBuf::from("/dev/i2c-1"));
        assert_eq!(config.address, 0x40);
        assert_eq!(config.interval(), Duration::from_millis(100));
    }

    #[test_case("0x45", 0x45; "hex lower")]
    #[test_case("0X4F", 0x4F; "hex upper")]
    #[test_case("64", 0x40; "decimal")]
    #[test_case(" 0x41 ", 0x41; "whitespace")]
    fn address_parsing(text: &str, expected: u8) {
        assert_eq!(parse_address(text).unwrap(), expected);
    }

    #[test]
    fn garbage_address_is_config_error() {
        assert!(matches!(parse_address("forty"), Err(Error::Config(_))));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::default()
            .with_overrides(lookup(&[
                (ENV_BUS, "/dev/i2c-7"),
                (ENV_ADDRESS, "0x44"),
                (ENV_INTERVAL_MS, "250"),
            ]))
            .unwrap();
        assert_eq!(config.bus, PathBuf::from("/dev/i2c-7"));
        assert_eq!(config.address, 0x44);
        assert_eq!(config.interval_ms, 250);
    }

    #[test]
    fn address_outside_strap_range_is_rejected() {
        let result = Config::default().with_overrides(lookup(&[(ENV_ADDRESS, "0x50")]));
        assert!(matches!(result, Err(Error::Hardware(_))));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = Config::default().with_overrides(lookup(&[(ENV_INTERVAL_MS, "0")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"address": 65}"#).unwrap();
        assert_eq!(config.address, 0x41);
        assert_eq!(config.bus, PathBuf::from("/dev/i2c-1"));
        assert_eq!(config.interval_ms, 100);
    }
}
