//! Address sweep discovering Neuron extensions on a bus.
//!
//! Every address in the range is probed in ascending order by reading the
//! 7-register identification block at holding register 1000. A device that
//! does not answer, answers with an error, or reports an unknown model ID is
//! skipped; the sweep never fails because of a single address.
//!
//! Modbus RTU is half-duplex, so the sweep is strictly sequential.
//!
//! # Example
//!
//! ```no_run
//! use neuron_ext::{Discovery, RtuTransport, SerialConfig};
//!
//! let mut transport = RtuTransport::connect(&SerialConfig::new("/dev/ttyUSB0"))?;
//! let result = Discovery::new(&mut transport).discover(1, 15)?;
//!
//! for (address, model) in result.iter() {
//!     println!("{model} at address {address}");
//! }
//! # Ok::<(), neuron_ext::NeuronError>(())
//! ```

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::device::{
    self, DeviceModel, IDENTIFICATION_BLOCK_LEN, IDENTIFICATION_BLOCK_START, MODEL_ID_INDEX,
};
use crate::error::{NeuronError, Result};
use crate::stop::StopHandle;
use crate::transport::Transport;

/// Per-probe timeout used while sweeping.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(200);

/// Address range swept by [`Discovery::discover_default`].
pub const DEFAULT_DISCOVERY_RANGE: RangeInclusive<u8> = 1..=15;

/// A device found during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Classified model.
    pub model: DeviceModel,
    /// Serial number from the identification block.
    pub serial_number: u32,
}

/// Devices found by a sweep, keyed by slave address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    devices: BTreeMap<u8, DiscoveredDevice>,
}

impl DiscoveryResult {
    /// Returns the model found at `address`, if any.
    pub fn model(&self, address: u8) -> Option<DeviceModel> {
        self.devices.get(&address).map(|d| d.model)
    }

    /// Returns the full record for `address`, if any.
    pub fn device(&self, address: u8) -> Option<&DiscoveredDevice> {
        self.devices.get(&address)
    }

    /// Iterates over `(address, model)` pairs in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, DeviceModel)> + '_ {
        self.devices.iter().map(|(address, d)| (*address, d.model))
    }

    /// Iterates over all records in ascending address order.
    pub fn devices(&self) -> impl Iterator<Item = (u8, &DiscoveredDevice)> + '_ {
        self.devices.iter().map(|(address, d)| (*address, d))
    }

    /// Number of devices found.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if no device answered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Converts the result into an address to model map.
    pub fn into_models(self) -> BTreeMap<u8, DeviceModel> {
        self.devices
            .into_iter()
            .map(|(address, d)| (address, d.model))
            .collect()
    }
}

/// Sweeps slave addresses looking for Neuron extensions.
pub struct Discovery<'a, T: Transport> {
    transport: &'a mut T,
    timeout: Duration,
    stop: StopHandle,
}

impl<'a, T: Transport> Discovery<'a, T> {
    /// Creates a discovery run that owns `transport` until it finishes.
    pub fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            timeout: DISCOVERY_TIMEOUT,
            stop: StopHandle::new(),
        }
    }

    /// Sets the per-probe timeout (default 200 ms).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses `stop` to end the sweep early.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Returns a handle that stops the sweep before its next probe.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Sweeps the default range 1..=15.
    pub fn discover_default(&mut self) -> Result<DiscoveryResult> {
        self.discover(*DEFAULT_DISCOVERY_RANGE.start(), *DEFAULT_DISCOVERY_RANGE.end())
    }

    /// Probes every address in `start..=end` and returns the devices found.
    ///
    /// A stopped sweep returns the devices found up to that point.
    ///
    /// # Errors
    ///
    /// Returns `NeuronError::InvalidRange` without touching the bus if
    /// `start` is 0 or greater than `end`.
    pub fn discover(&mut self, start: u8, end: u8) -> Result<DiscoveryResult> {
        if start == 0 || start > end {
            return Err(NeuronError::InvalidRange { start, end });
        }

        log::info!("Starting discovery from address {start} to {end}");
        self.transport.set_timeout(self.timeout);

        let mut result = DiscoveryResult::default();
        for address in start..=end {
            if self.stop.is_stopped() {
                log::info!("Discovery stopped before address {address}");
                break;
            }
            if let Some(device) = self.probe(address) {
                log::info!(
                    "Found {} at address {address}, serial number {}",
                    device.model,
                    device.serial_number
                );
                result.devices.insert(address, device);
            }
        }

        log::info!("Discovery finished, {} device(s) found", result.len());
        Ok(result)
    }

    fn probe(&mut self, address: u8) -> Option<DiscoveredDevice> {
        log::debug!("Probing address {address}");
        self.transport.set_slave(address);

        let block = match self
            .transport
            .read_holding_registers(IDENTIFICATION_BLOCK_START, IDENTIFICATION_BLOCK_LEN)
        {
            Ok(block) => block,
            Err(e) => {
                log::debug!("No device at address {address}: {e}");
                return None;
            }
        };

        let Some(&model_id) = block.get(MODEL_ID_INDEX) else {
            log::debug!("Identification block from address {address} is too short");
            return None;
        };
        let Some(model) = device::classify(model_id) else {
            log::debug!("Unknown model {model_id} at address {address}, skipping");
            return None;
        };

        Some(DiscoveredDevice {
            model,
            serial_number: device::serial_number(&block).unwrap_or_default(),
        })
    }
}
