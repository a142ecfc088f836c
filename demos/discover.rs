//! Example: Discovering Neuron extensions on a bus
//!
//! Run with: cargo run --example discover
//!
//! This example demonstrates:
//! - Opening a Modbus RTU line
//! - Sweeping the default address range (1-15)
//! - Printing model and serial number of every extension found
//!
//! Set `RUST_LOG=debug` to see every probe.

use neuron_ext::{Baudrate, Discovery, NeuronError, Parity, RtuTransport, SerialConfig};

fn main() -> neuron_ext::Result<()> {
    env_logger::init();

    // =========================================================================
    // Open the serial line
    // =========================================================================

    let config = SerialConfig::new("/dev/ttyUSB0")
        .with_baudrate(Baudrate::B19200)
        .with_parity(Parity::None);

    let mut transport = match RtuTransport::connect(&config) {
        Ok(transport) => transport,
        Err(e @ NeuronError::Connection { .. }) => {
            println!("{e}");
            println!("\nTo run this example, ensure:");
            println!("  1. An RS-485 adapter is attached at {}", config.port);
            println!("  2. The line settings match the extensions on the bus");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    // =========================================================================
    // Sweep
    // =========================================================================

    println!("Discovering, from 1 to 15 ...");
    let result = Discovery::new(&mut transport).discover_default()?;

    if result.is_empty() {
        println!("Found no devices");
    } else {
        for (address, device) in result.devices() {
            println!(
                "  - Device {} address: {} serial number: {}",
                device.model, address, device.serial_number
            );
        }
    }

    Ok(())
}
