//! Example: Writing new bus settings to an extension
//!
//! Run with: cargo run --example write_settings
//!
//! Moves the extension answering on address 15 (19200 baud, no parity) to
//! address 1, 115200 baud, even parity. The new settings take effect after
//! the extension is power cycled.

use neuron_ext::{
    Baudrate, DeviceSettings, NeuronError, Parity, RtuTransport, SerialConfig, SettingsWriter,
    WriteStep,
};

fn main() -> neuron_ext::Result<()> {
    env_logger::init();

    let current_address = 15;
    let settings = DeviceSettings::new(1, Baudrate::B115200, Parity::Even)?;

    let config = SerialConfig::new("/dev/ttyUSB0")
        .with_baudrate(Baudrate::B19200)
        .with_parity(Parity::None);
    let mut transport = RtuTransport::connect(&config)?;

    println!("Writing settings to device address: {current_address}");
    match SettingsWriter::new(&mut transport).write_settings(current_address, &settings) {
        Ok(model) => {
            println!("Settings have been written successfully to {model}");
            println!("Power cycle the extension now!");
        }
        Err(NeuronError::UnrecognizedDevice { model_id, .. }) => {
            println!("Unknown model {model_id}, nothing was written");
        }
        Err(NeuronError::Write {
            step: WriteStep::Commit,
            source,
        }) => {
            // Registers are written but not stored; run the whole write again
            println!("Store command failed ({source}), repeat the write");
        }
        Err(e) => return Err(e),
    }

    Ok(())
}
