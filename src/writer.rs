//! Writing new bus settings to a Neuron extension.
//!
//! A settings write is a chain of three exchanges with one device:
//!
//! 1. read the model-ID register (1004) and look up the model's configuration block
//! 2. write `[config word, target address]` to the two configuration registers
//! 3. set the commit coil (1003), which stores the settings and applies them
//!
//! Each step only runs if the previous one succeeded. There is no rollback:
//! when the commit fails the registers hold the new values but the device
//! keeps running on its old configuration until the whole sequence is
//! repeated.
//!
//! # Example
//!
//! ```no_run
//! use neuron_ext::{Baudrate, Parity, RtuTransport, SerialConfig, SettingsWriter};
//!
//! let mut transport = RtuTransport::connect(&SerialConfig::new("/dev/ttyUSB0"))?;
//!
//! // Move the device at address 15 to address 3, 115200 baud, even parity
//! let model = SettingsWriter::new(&mut transport).write(15, 3, Baudrate::B115200, Parity::Even)?;
//! println!("{model} configured, power cycle it now");
//! # Ok::<(), neuron_ext::NeuronError>(())
//! ```

use std::time::Duration;

use crate::device::{self, DeviceModel, COMMIT_COIL, MODEL_ID_REGISTER};
use crate::error::{NeuronError, Result, TransportError, WriteStep};
use crate::settings::{validate_address, Baudrate, DeviceSettings, Parity};
use crate::transport::Transport;

/// Per-request timeout used while writing settings.
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Extra attempts per exchange before a write step fails.
pub const DEFAULT_WRITE_RETRIES: usize = 3;

/// Writes address, baudrate and parity settings to one device.
pub struct SettingsWriter<'a, T: Transport> {
    transport: &'a mut T,
    timeout: Duration,
    retries: usize,
}

impl<'a, T: Transport> SettingsWriter<'a, T> {
    /// Creates a writer that owns `transport` until it finishes.
    pub fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            timeout: WRITE_TIMEOUT,
            retries: DEFAULT_WRITE_RETRIES,
        }
    }

    /// Sets the per-request timeout (default 1 s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many times a failed exchange is repeated (default 3).
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Validates the new settings, then writes them to the device at `current_address`.
    ///
    /// # Errors
    ///
    /// - `NeuronError::Configuration` for an invalid address, before any I/O
    /// - see [`write_settings`](Self::write_settings) for bus errors
    pub fn write(
        &mut self,
        current_address: u8,
        new_address: u16,
        baudrate: Baudrate,
        parity: Parity,
    ) -> Result<DeviceModel> {
        let settings = DeviceSettings::new(new_address, baudrate, parity)?;
        self.write_settings(current_address, &settings)
    }

    /// Writes `settings` to the device at `current_address` and commits them.
    ///
    /// Returns the model of the configured device.
    ///
    /// # Errors
    ///
    /// - `NeuronError::Configuration` if `current_address` is 0, before any I/O
    /// - `NeuronError::UnrecognizedDevice` if the model ID is unknown; nothing is written
    /// - `NeuronError::Write` naming the step whose exchange failed after all retries
    pub fn write_settings(
        &mut self,
        current_address: u8,
        settings: &DeviceSettings,
    ) -> Result<DeviceModel> {
        validate_address("current address", u16::from(current_address))?;

        log::info!(
            "Writing settings to address {current_address}: address {}, {} baud, parity {}",
            settings.target_address(),
            settings.baudrate(),
            settings.parity()
        );

        self.transport.set_timeout(self.timeout);
        self.transport.set_slave(current_address);

        let model_id = self.exchange(WriteStep::ReadModel, |t| {
            t.read_holding_registers(MODEL_ID_REGISTER, 1)?
                .first()
                .copied()
                .ok_or(TransportError::ShortResponse {
                    expected: 1,
                    received: 0,
                })
        })?;
        let model = device::classify(model_id).ok_or(NeuronError::UnrecognizedDevice {
            address: current_address,
            model_id,
        })?;
        log::debug!("Device at address {current_address} is {model}");

        let base = model.config_base_register();
        let registers = settings.registers();
        self.exchange(WriteStep::WriteRegisters, |t| {
            t.write_registers(base, &registers)
        })?;
        log::debug!("Wrote {registers:04X?} at register {base}, sending store command");

        self.exchange(WriteStep::Commit, |t| t.write_coil(COMMIT_COIL, true))?;
        log::info!("Settings stored on {model}, power cycle the extension to apply them");

        Ok(model)
    }

    /// Runs one exchange, repeating it up to `retries` times on failure.
    fn exchange<R>(
        &mut self,
        step: WriteStep,
        mut op: impl FnMut(&mut T) -> std::result::Result<R, TransportError>,
    ) -> Result<R> {
        let mut attempt = 0;
        loop {
            match op(&mut *self.transport) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    log::warn!("Step '{step}' failed ({e}), retry {attempt}/{}", self.retries);
                }
                Err(e) => return Err(NeuronError::write(step, e)),
            }
        }
    }
}
