//! # Neuron Extension Bus Library
//!
//! A Rust library for discovering, configuring and testing Neuron I/O
//! extension modules over a Modbus RTU serial bus.
//!
//! Every operation is a strictly sequential chain of blocking Modbus
//! exchanges on a transport it borrows exclusively, so a half-duplex RTU bus
//! never sees two requests in flight.
//!
//! ## Features
//!
//! - **Discovery** — sweep an address range and classify every extension found
//! - **Settings** — write a new slave address, baudrate and parity, then commit them
//! - **Connection test** — measure round-trip times and count failed exchanges
//! - **Type-safe** — models, baudrates and parities as enums; addresses validated before I/O
//! - **No panics** — all errors returned as `Result<T, NeuronError>`
//!
//! ## Quick Start
//!
//! ```no_run
//! use neuron_ext::{
//!     Baudrate, ConnectionTester, Discovery, Parity, RtuTransport, SerialConfig, SettingsWriter,
//! };
//!
//! fn main() -> neuron_ext::Result<()> {
//!     let config = SerialConfig::new("/dev/ttyUSB0")
//!         .with_baudrate(Baudrate::B19200)
//!         .with_parity(Parity::None);
//!     let mut transport = RtuTransport::connect(&config)?;
//!
//!     // Find extensions on addresses 1-15
//!     let devices = Discovery::new(&mut transport).discover(1, 15)?;
//!     for (address, model) in devices.iter() {
//!         println!("{model} at address {address}");
//!     }
//!
//!     // Move the extension at address 15 to address 2, 115200 baud, even parity
//!     SettingsWriter::new(&mut transport).write(15, 2, Baudrate::B115200, Parity::Even)?;
//!
//!     // 100 timed reads against address 15
//!     let result = ConnectionTester::new(&mut transport).run(15, 100)?;
//!     println!("{} errors in {} cycles", result.errors, result.cycles);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Register Map
//!
//! | Register | Kind | Content |
//! |----------|------|---------|
//! | 1000-1006 | Holding | Identification block; 1004 holds the model ID, 1005/1006 the serial number |
//! | model base, base+1 | Holding | [`ConfigWord`], new slave address (see [`DeviceModel::config_base_register`]) |
//! | 1003 | Coil | Store pending configuration and apply it |
//!
//! ## Error Handling
//!
//! ```no_run
//! use neuron_ext::{NeuronError, RtuTransport, SerialConfig, SettingsWriter, Baudrate, Parity};
//!
//! let mut transport = RtuTransport::connect(&SerialConfig::new("/dev/ttyUSB0"))?;
//!
//! match SettingsWriter::new(&mut transport).write(15, 2, Baudrate::B9600, Parity::None) {
//!     Ok(model) => println!("{model} configured"),
//!     Err(NeuronError::UnrecognizedDevice { model_id, .. }) => {
//!         println!("Unknown model {model_id}, refusing to write");
//!     }
//!     Err(NeuronError::Write { step, source }) => println!("Failed at {step}: {source}"),
//!     Err(e) => println!("Error: {e}"),
//! }
//! # Ok::<(), NeuronError>(())
//! ```
//!
//! ## Logging
//!
//! The library logs through the [`log`](https://docs.rs/log) facade and never
//! installs a logger. Install one (for example `env_logger`) in the
//! application to see probes, retries and test cycles.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod device;
mod discovery;
mod error;
mod settings;
mod stop;
mod tester;
mod transport;
mod writer;

// Public re-exports
pub use device::{
    classify, DeviceModel, COMMIT_COIL, IDENTIFICATION_BLOCK_LEN, IDENTIFICATION_BLOCK_START,
    MODEL_ID_INDEX, MODEL_ID_REGISTER, MODEL_TABLE,
};
pub use discovery::{
    DiscoveredDevice, Discovery, DiscoveryResult, DEFAULT_DISCOVERY_RANGE, DISCOVERY_TIMEOUT,
};
pub use error::{NeuronError, Result, TransportError, WriteStep};
pub use settings::{
    Baudrate, ConfigWord, DeviceSettings, Parity, MAX_SLAVE_ADDRESS, MIN_SLAVE_ADDRESS,
    PARITY_ENABLE_BIT, PARITY_ODD_BIT,
};
pub use stop::StopHandle;
pub use tester::{
    ConnectionTester, PayloadSequence, TestResult, DEFAULT_TEST_CYCLES, TEST_TIMEOUT,
};
pub use transport::{RtuTransport, SerialConfig, Transport, DEFAULT_BAUDRATE, DEFAULT_TIMEOUT};
pub use writer::{SettingsWriter, DEFAULT_WRITE_RETRIES, WRITE_TIMEOUT};
