//! Command-line interface for one-off INA260 queries.

use std::env;

use anyhow::Result;

use ina260::config::Config;
use ina260::hw_trait::linux::LinuxI2c;
use ina260::peripheral::ina260::{protocol, Ina260};
use ina260::tracing;

fn main() -> Result<()> {
    tracing::init_stderr_quiet();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: ina260-cli <command>");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  read      Print current, voltage and power once");
        eprintln!("  voltage   Print bus voltage (V)");
        eprintln!("  current   Print current (mA)");
        eprintln!("  power     Print power (mW)");
        eprintln!("  id        Print and check manufacturer and die IDs");
        eprintln!("  config    Decode the configuration register");
        eprintln!("  dump      Read and decode every register");
        eprintln!();
        eprintln!("Environment:");
        eprintln!("  INA260_I2C_BUS      I2C adapter (default: /dev/i2c-1)");
        eprintln!("  INA260_ADDRESS      Sensor address (default: 0x40)");
        std::process::exit(1);
    }

    let config = Config::from_env()?;
    let bus = LinuxI2c::open(&config.bus)?;
    let mut sensor = Ina260::new_with_address(bus, config.address)?;

    let command = &args[1];

    match command.as_str() {
        "read" => println!("{}", sensor.read_measurement()?),
        "voltage" => println!("{}", sensor.read_voltage()?),
        "current" => println!("{}", sensor.read_current()?),
        "power" => println!("{}", sensor.read_power()?),
        "id" => cmd_id(&mut sensor)?,
        "config" => println!("{}", sensor.read_configuration()?),
        "dump" => cmd_dump(&mut sensor)?,
        _ => {
            eprintln!("Unknown command: {}", command);
            eprintln!("Run without arguments to see usage.");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn cmd_id(sensor: &mut Ina260<LinuxI2c>) -> Result<()> {
    let mfg_id = sensor.read_manufacturer_id()?;
    let die_id = sensor.read_die_id()?;
    println!("manufacturer: 0x{:04x}", mfg_id);
    println!("die:          {}", die_id);
    sensor.verify_identity()?;
    println!("INA260 detected at 0x{:02x}", sensor.address());
    Ok(())
}

fn cmd_dump(sensor: &mut Ina260<LinuxI2c>) -> Result<()> {
    for reg in protocol::ALL_REGISTERS {
        let raw = sensor.read_register(reg)?;
        println!(
            "0x{:02x} {:<12} {}",
            reg,
            protocol::register_name(reg),
            protocol::decode_value(reg, raw)
        );
    }
    Ok(())
}
