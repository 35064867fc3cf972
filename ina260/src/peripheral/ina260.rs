//! INA260 current, voltage and power monitor driver.
//!
//! The INA260 measures current through an integrated 2 mOhm shunt together
//! with the bus voltage, and computes power internally. All results sit in
//! 16-bit big-endian registers with fixed LSB weights, so no calibration is
//! needed.
//!
//! Datasheet: <https://www.ti.com/lit/ds/symlink/ina260.pdf>

use std::fmt;

use strum::Display;

use crate::{
    hw_trait::{i2c::I2c, HwError, Result},
    tracing::prelude::*,
};

/// Default I2C address (A0 and A1 tied to GND)
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Lowest address reachable through the A0/A1 strapping pins
pub const MIN_ADDRESS: u8 = 0x40;

/// Highest address reachable through the A0/A1 strapping pins
pub const MAX_ADDRESS: u8 = 0x4F;

/// Reject addresses the address pins cannot select.
pub fn check_address(address: u8) -> Result<()> {
    if (MIN_ADDRESS..=MAX_ADDRESS).contains(&address) {
        Ok(())
    } else {
        Err(HwError::InvalidParameter(format!(
            "INA260 address 0x{:02X} outside 0x{:02X}-0x{:02X}",
            address, MIN_ADDRESS, MAX_ADDRESS
        )))
    }
}

/// Register map and pure decoders, shared with tooling that inspects bus
/// traffic.
pub mod protocol {
    /// Expected MFG_UID contents ("TI" in ASCII)
    pub const EXPECTED_MFG_ID: u16 = 0x5449;

    /// Expected device field (bits 15..4) of DIE_UID
    pub const EXPECTED_DIE_ID: u16 = 0x227;

    /// Bus voltage LSB in millivolts
    pub const VOLTAGE_LSB_MV: f64 = 1.25;

    /// Current LSB in milliamps
    pub const CURRENT_LSB_MA: f64 = 1.25;

    /// Power LSB in milliwatts
    pub const POWER_LSB_MW: f64 = 10.0;

    /// INA260 register addresses
    pub mod regs {
        /// Configuration register (R/W)
        pub const CONFIG: u8 = 0x00;
        /// Current register, signed (R)
        pub const CURRENT: u8 = 0x01;
        /// Bus voltage register (R)
        pub const BUS_VOLTAGE: u8 = 0x02;
        /// Power register (R)
        pub const POWER: u8 = 0x03;
        /// Mask/enable register (R/W)
        pub const MASK_ENABLE: u8 = 0x06;
        /// Alert limit register (R/W)
        pub const ALERT_LIMIT: u8 = 0x07;
        /// Manufacturer ID register (R)
        pub const MFG_UID: u8 = 0xFE;
        /// Die ID register (R)
        pub const DIE_UID: u8 = 0xFF;
    }

    /// Every register, in address order.
    pub const ALL_REGISTERS: [u8; 8] = [
        regs::CONFIG,
        regs::CURRENT,
        regs::BUS_VOLTAGE,
        regs::POWER,
        regs::MASK_ENABLE,
        regs::ALERT_LIMIT,
        regs::MFG_UID,
        regs::DIE_UID,
    ];

    /// Get register name from address
    pub fn register_name(addr: u8) -> String {
        match addr {
            regs::CONFIG => "CONFIG".to_string(),
            regs::CURRENT => "CURRENT".to_string(),
            regs::BUS_VOLTAGE => "BUS_VOLTAGE".to_string(),
            regs::POWER => "POWER".to_string(),
            regs::MASK_ENABLE => "MASK_ENABLE".to_string(),
            regs::ALERT_LIMIT => "ALERT_LIMIT".to_string(),
            regs::MFG_UID => "MFG_UID".to_string(),
            regs::DIE_UID => "DIE_UID".to_string(),
            _ => format!("UNKNOWN[0x{:02x}]", addr),
        }
    }

    /// Bus voltage in volts. The register is unsigned.
    pub fn decode_bus_voltage(raw: u16) -> f64 {
        f64::from(raw) * VOLTAGE_LSB_MV / 1000.0
    }

    /// Current in milliamps. The register is two's complement; negative
    /// values mean current flowing from VIN- to VIN+.
    pub fn decode_current(raw: u16) -> f64 {
        let signed = i16::from_be_bytes(raw.to_be_bytes());
        f64::from(signed) * CURRENT_LSB_MA
    }

    /// Power in milliwatts. The register is unsigned.
    pub fn decode_power(raw: u16) -> f64 {
        f64::from(raw) * POWER_LSB_MW
    }

    /// Decode a register value for display.
    pub fn decode_value(reg: u8, raw: u16) -> String {
        match reg {
            regs::CURRENT => format!("{} mA", decode_current(raw)),
            regs::BUS_VOLTAGE => format!("{} V", decode_bus_voltage(raw)),
            regs::POWER => format!("{} mW", decode_power(raw)),
            regs::CONFIG => format!("0x{:04x} ({})", raw, super::Configuration::from_bits(raw)),
            regs::MFG_UID => format!(
                "0x{:04x} ({})",
                raw,
                if raw == EXPECTED_MFG_ID { "Texas Instruments" } else { "Unknown" }
            ),
            regs::DIE_UID => format!("0x{:04x} ({})", raw, super::DieId::from_bits(raw)),
            _ => format!("0x{:04x}", raw),
        }
    }

    /// Format an INA260 I2C transaction
    pub fn format_transaction(reg: u8, data: Option<&[u8]>, is_read: bool) -> String {
        let reg_name = register_name(reg);
        let word = data.and_then(|d| <[u8; 2]>::try_from(d).ok()).map(u16::from_be_bytes);

        match (is_read, data, word) {
            (true, _, Some(raw)) => format!("-> READ {}={}", reg_name, decode_value(reg, raw)),
            (true, Some(data), None) => format!("-> READ {}={:02x?}", reg_name, data),
            (true, None, _) => format!("-> READ {}", reg_name),
            (false, _, Some(raw)) => format!("<- WRITE {}=0x{:04x}", reg_name, raw),
            (false, Some(data), None) => format!("<- WRITE {}={:02x?}", reg_name, data),
            (false, None, _) => format!("<- WRITE REG[0x{:02x}]", reg),
        }
    }
}

use protocol::regs;

/// Number of samples averaged per result (CONFIG bits 11..9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AveragingCount {
    #[strum(to_string = "1")]
    Count1,
    #[strum(to_string = "4")]
    Count4,
    #[strum(to_string = "16")]
    Count16,
    #[strum(to_string = "64")]
    Count64,
    #[strum(to_string = "128")]
    Count128,
    #[strum(to_string = "256")]
    Count256,
    #[strum(to_string = "512")]
    Count512,
    #[strum(to_string = "1024")]
    Count1024,
}

impl AveragingCount {
    fn from_field(field: u16) -> Self {
        match field & 0b111 {
            0 => Self::Count1,
            1 => Self::Count4,
            2 => Self::Count16,
            3 => Self::Count64,
            4 => Self::Count128,
            5 => Self::Count256,
            6 => Self::Count512,
            _ => Self::Count1024,
        }
    }

    pub fn samples(self) -> u16 {
        match self {
            Self::Count1 => 1,
            Self::Count4 => 4,
            Self::Count16 => 16,
            Self::Count64 => 64,
            Self::Count128 => 128,
            Self::Count256 => 256,
            Self::Count512 => 512,
            Self::Count1024 => 1024,
        }
    }
}

/// ADC conversion time (CONFIG bits 8..6 for voltage, 5..3 for current)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConversionTime {
    #[strum(to_string = "140 us")]
    Us140,
    #[strum(to_string = "204 us")]
    Us204,
    #[strum(to_string = "332 us")]
    Us332,
    #[strum(to_string = "588 us")]
    Us588,
    #[strum(to_string = "1.1 ms")]
    Ms1_1,
    #[strum(to_string = "2.116 ms")]
    Ms2_116,
    #[strum(to_string = "4.156 ms")]
    Ms4_156,
    #[strum(to_string = "8.244 ms")]
    Ms8_244,
}

impl ConversionTime {
    fn from_field(field: u16) -> Self {
        match field & 0b111 {
            0 => Self::Us140,
            1 => Self::Us204,
            2 => Self::Us332,
            3 => Self::Us588,
            4 => Self::Ms1_1,
            5 => Self::Ms2_116,
            6 => Self::Ms4_156,
            _ => Self::Ms8_244,
        }
    }

    pub fn micros(self) -> u32 {
        match self {
            Self::Us140 => 140,
            Self::Us204 => 204,
            Self::Us332 => 332,
            Self::Us588 => 588,
            Self::Ms1_1 => 1_100,
            Self::Ms2_116 => 2_116,
            Self::Ms4_156 => 4_156,
            Self::Ms8_244 => 8_244,
        }
    }
}

/// Which quantities a triggered or continuous mode converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    pub current: bool,
    pub voltage: bool,
}

/// Operating mode (CONFIG bits 2..0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Shutdown,
    Triggered(Channels),
    Continuous(Channels),
}

impl Mode {
    fn from_field(field: u16) -> Self {
        let channels = Channels {
            current: field & 0b001 != 0,
            voltage: field & 0b010 != 0,
        };
        if !channels.current && !channels.voltage {
            Self::Shutdown
        } else if field & 0b100 != 0 {
            Self::Continuous(channels)
        } else {
            Self::Triggered(channels)
        }
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.current, self.voltage) {
            (true, true) => write!(f, "current+voltage"),
            (true, false) => write!(f, "current"),
            (false, true) => write!(f, "voltage"),
            (false, false) => write!(f, "none"),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "shutdown"),
            Self::Triggered(ch) => write!(f, "triggered {}", ch),
            Self::Continuous(ch) => write!(f, "continuous {}", ch),
        }
    }
}

/// Decoded snapshot of the CONFIG register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub averaging: AveragingCount,
    pub bus_conversion: ConversionTime,
    pub current_conversion: ConversionTime,
    pub mode: Mode,
}

impl Configuration {
    const AVG_SHIFT: u16 = 9;
    const VBUSCT_SHIFT: u16 = 6;
    const ISHCT_SHIFT: u16 = 3;

    pub fn from_bits(raw: u16) -> Self {
        Self {
            averaging: AveragingCount::from_field(raw >> Self::AVG_SHIFT),
            bus_conversion: ConversionTime::from_field(raw >> Self::VBUSCT_SHIFT),
            current_conversion: ConversionTime::from_field(raw >> Self::ISHCT_SHIFT),
            mode: Mode::from_field(raw & 0b111),
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avg {}, vbus {}, ishunt {}, {}",
            self.averaging, self.bus_conversion, self.current_conversion, self.mode
        )
    }
}

/// Contents of the DIE_UID register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DieId {
    pub device: u16,
    pub revision: u8,
}

impl DieId {
    pub fn from_bits(raw: u16) -> Self {
        Self {
            device: raw >> 4,
            revision: (raw & 0x000F) as u8,
        }
    }
}

impl fmt::Display for DieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device 0x{:03x} rev {}", self.device, self.revision)
    }
}

/// One reading of all three quantities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Bus voltage in volts
    pub voltage_v: f64,
    /// Current in milliamps; negative for reverse flow
    pub current_ma: f64,
    /// Power in milliwatts
    pub power_mw: f64,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug keeps the trailing ".0" on whole volts and milliamps
        write!(
            f,
            "{:?}mA,  {:?}V,   {}mW",
            self.current_ma, self.voltage_v, self.power_mw
        )
    }
}

/// INA260 driver
///
/// Every read is exactly one bus transaction. Nothing is cached and failed
/// transactions are returned to the caller untouched; the handle stays
/// usable afterwards.
pub struct Ina260<I: I2c> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Ina260<I> {
    /// Create a new INA260 driver with default address
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
        }
    }

    /// Create a new INA260 driver with custom address
    pub fn new_with_address(i2c: I, address: u8) -> Result<Self> {
        check_address(address)?;
        Ok(Self { i2c, address })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }

    /// Read bus voltage in volts
    pub fn read_voltage(&mut self) -> Result<f64> {
        let raw = self.read_register(regs::BUS_VOLTAGE)?;
        Ok(protocol::decode_bus_voltage(raw))
    }

    /// Read current in milliamps
    pub fn read_current(&mut self) -> Result<f64> {
        let raw = self.read_register(regs::CURRENT)?;
        Ok(protocol::decode_current(raw))
    }

    /// Read power in milliwatts
    pub fn read_power(&mut self) -> Result<f64> {
        let raw = self.read_register(regs::POWER)?;
        Ok(protocol::decode_power(raw))
    }

    /// Read current, voltage and power, one transaction each.
    pub fn read_measurement(&mut self) -> Result<Measurement> {
        let current_ma = self.read_current()?;
        let voltage_v = self.read_voltage()?;
        let power_mw = self.read_power()?;
        Ok(Measurement {
            voltage_v,
            current_ma,
            power_mw,
        })
    }

    /// Read and decode the CONFIG register
    pub fn read_configuration(&mut self) -> Result<Configuration> {
        let raw = self.read_register(regs::CONFIG)?;
        let config = Configuration::from_bits(raw);
        debug!(raw = format!("{:#06x}", raw), "INA260 configuration: {}", config);
        Ok(config)
    }

    pub fn read_manufacturer_id(&mut self) -> Result<u16> {
        self.read_register(regs::MFG_UID)
    }

    pub fn read_die_id(&mut self) -> Result<DieId> {
        Ok(DieId::from_bits(self.read_register(regs::DIE_UID)?))
    }

    /// Confirm the device at our address is an INA260.
    pub fn verify_identity(&mut self) -> Result<()> {
        let mfg_id = self.read_manufacturer_id()?;
        if mfg_id != protocol::EXPECTED_MFG_ID {
            return Err(HwError::InvalidParameter(format!(
                "Wrong manufacturer ID: 0x{:04X}, expected 0x{:04X}",
                mfg_id,
                protocol::EXPECTED_MFG_ID
            )));
        }

        let die_id = self.read_die_id()?;
        if die_id.device != protocol::EXPECTED_DIE_ID {
            return Err(HwError::InvalidParameter(format!(
                "Wrong die ID: 0x{:03X}, expected 0x{:03X}",
                die_id.device,
                protocol::EXPECTED_DIE_ID
            )));
        }

        debug!(
            address = format!("{:#04x}", self.address),
            mfg_id = format!("{:#06x}", mfg_id),
            revision = die_id.revision,
            "Detected INA260"
        );
        Ok(())
    }

    /// Read a raw 16-bit register.
    pub fn read_register(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.address, &[reg], &mut buf)?;
        trace!("{}", protocol::format_transaction(reg, Some(&buf), true));
        Ok(u16::from_be_bytes(buf))
    }

    /// Write a raw 16-bit register.
    pub fn write_register(&mut self, reg: u8, value: u16) -> Result<()> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c.write(self.address, &[reg, hi, lo])?;
        trace!("{}", protocol::format_transaction(reg, Some(&[hi, lo]), false));
        Ok(())
    }
}
