//! Round-trip latency and error-rate test against one device.
//!
//! The tester selects the slave once, then reads the model-ID register
//! (1004) `cycles` times in a row, timing every exchange. A failed exchange
//! counts as an error and the test moves on to the next cycle.
//!
//! # Example
//!
//! ```no_run
//! use neuron_ext::{ConnectionTester, RtuTransport, SerialConfig};
//!
//! let mut transport = RtuTransport::connect(&SerialConfig::new("/dev/ttyUSB0"))?;
//! let result = ConnectionTester::new(&mut transport).run(15, 100)?;
//!
//! println!(
//!     "{} cycles, {} errors, average {:.3} s",
//!     result.cycles,
//!     result.errors,
//!     result.average_response_time_secs()
//! );
//! # Ok::<(), neuron_ext::NeuronError>(())
//! ```

use std::time::{Duration, Instant};

use crate::device::MODEL_ID_REGISTER;
use crate::error::Result;
use crate::settings::validate_address;
use crate::stop::StopHandle;
use crate::transport::Transport;

/// Per-request timeout used while testing.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(200);

/// Number of cycles a standard connection test runs.
pub const DEFAULT_TEST_CYCLES: u32 = 100;

/// Rolling request payload: 0x01, 0x03, 0x07, 0x0F, 0x1F, 0x3E, 0x7C, ...
///
/// Each step shifts left by one; when bit 4 (0x10) was clear, bit 0 is set
/// in the shifted value. Bits shifted past bit 15 are dropped.
///
/// # Example
///
/// ```
/// use neuron_ext::PayloadSequence;
///
/// let first: Vec<u16> = PayloadSequence::new().take(7).collect();
/// assert_eq!(first, [0x01, 0x03, 0x07, 0x0F, 0x1F, 0x3E, 0x7C]);
/// ```
#[derive(Debug, Clone)]
pub struct PayloadSequence {
    next: u16,
}

impl PayloadSequence {
    /// First payload of every test.
    pub const START: u16 = 0x01;

    /// Creates a sequence starting at 0x01.
    pub fn new() -> Self {
        Self { next: Self::START }
    }

    /// Returns the payload following `value`.
    pub fn advance(value: u16) -> u16 {
        let shifted = value << 1;
        if value & 0x10 != 0 {
            shifted
        } else {
            shifted | 0x01
        }
    }
}

impl Default for PayloadSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for PayloadSequence {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let current = self.next;
        self.next = Self::advance(current);
        Some(current)
    }
}

/// Outcome of a connection test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    /// Cycles performed.
    pub cycles: u32,
    /// Cycles whose exchange failed.
    pub errors: u32,
    /// Mean round-trip time of the successful cycles; zero if none succeeded.
    pub average_response_time: Duration,
}

impl TestResult {
    /// Number of successful cycles.
    pub fn successes(&self) -> u32 {
        self.cycles.saturating_sub(self.errors)
    }

    /// Mean round-trip time in seconds.
    pub fn average_response_time_secs(&self) -> f64 {
        self.average_response_time.as_secs_f64()
    }
}

/// Accumulates per-cycle outcomes while a test runs.
#[derive(Debug, Default)]
struct Tally {
    cycles: u32,
    errors: u32,
    total: Duration,
}

impl Tally {
    fn success(&mut self, elapsed: Duration) {
        self.cycles += 1;
        self.total += elapsed;
    }

    fn failure(&mut self) {
        self.cycles += 1;
        self.errors += 1;
    }

    fn finish(self) -> TestResult {
        let successes = self.cycles - self.errors;
        let average_response_time = if successes == 0 {
            Duration::ZERO
        } else {
            self.total / successes
        };
        TestResult {
            cycles: self.cycles,
            errors: self.errors,
            average_response_time,
        }
    }
}

/// Measures response times of one device.
pub struct ConnectionTester<'a, T: Transport> {
    transport: &'a mut T,
    timeout: Duration,
    stop: StopHandle,
}

impl<'a, T: Transport> ConnectionTester<'a, T> {
    /// Creates a tester that owns `transport` until it finishes.
    pub fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            timeout: TEST_TIMEOUT,
            stop: StopHandle::new(),
        }
    }

    /// Sets the per-request timeout (default 200 ms).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses `stop` to end the test early.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Returns a handle that stops the test before its next cycle.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs `cycles` timed reads against the device at `address`.
    ///
    /// A stopped test reports only the cycles it performed.
    ///
    /// # Errors
    ///
    /// Returns `NeuronError::Configuration` if `address` is 0. Bus failures
    /// never abort the test; they are counted in [`TestResult::errors`].
    pub fn run(&mut self, address: u8, cycles: u32) -> Result<TestResult> {
        validate_address("address", u16::from(address))?;

        log::info!("Starting test of address {address}, {cycles} cycles");
        self.transport.set_timeout(self.timeout);
        self.transport.set_slave(address);

        let mut tally = Tally::default();
        for (cycle, payload) in (1..=cycles).zip(PayloadSequence::new()) {
            if self.stop.is_stopped() {
                log::info!("Test stopped after {} cycles", tally.cycles);
                break;
            }
            log::trace!("Cycle {cycle}, payload 0x{payload:04X}");

            let started = Instant::now();
            match self.transport.read_holding_registers(MODEL_ID_REGISTER, 1) {
                Ok(_) => {
                    let elapsed = started.elapsed();
                    log::debug!("Cycle {cycle} ok in {elapsed:?}");
                    tally.success(elapsed);
                }
                Err(e) => {
                    log::warn!("Cycle {cycle} failed: {e}");
                    tally.failure();
                }
            }
        }

        let result = tally.finish();
        log::info!(
            "Test finished: {} cycles, {} errors, average response time {:?}",
            result.cycles,
            result.errors,
            result.average_response_time
        );
        Ok(result)
    }
}
