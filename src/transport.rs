//! Modbus RTU transport for talking to Neuron extensions.
//!
//! The [`Transport`] trait is the only thing the bus operations know about
//! the wire: select a slave, read holding registers, write holding registers,
//! write a coil. [`RtuTransport`] implements it over a serial line with the
//! synchronous `tokio-modbus` RTU client.
//!
//! # Design
//!
//! - **Blocking** - every call is one request and one reply, bounded by the timeout
//! - **No retries** - a failed exchange is reported once; retry policy belongs to the caller
//! - **Exclusive** - operations borrow the transport mutably, so a half-duplex
//!   bus never sees two requests in flight
//!
//! # Example
//!
//! ```no_run
//! use neuron_ext::{Baudrate, Parity, RtuTransport, SerialConfig, Transport};
//!
//! let config = SerialConfig::new("/dev/ttyUSB0")
//!     .with_baudrate(Baudrate::B19200)
//!     .with_parity(Parity::None);
//! let mut transport = RtuTransport::connect(&config)?;
//!
//! transport.set_slave(15);
//! let model_id = transport.read_holding_registers(1004, 1)?;
//! # Ok::<(), neuron_ext::NeuronError>(())
//! ```

use std::io;
use std::time::Duration;

use tokio_modbus::client::sync::{Context, Reader, Writer};
use tokio_modbus::slave::{Slave, SlaveContext};

use crate::error::{NeuronError, Result, TransportError};
use crate::settings::{Baudrate, Parity};

/// Default line baudrate.
pub const DEFAULT_BAUDRATE: Baudrate = Baudrate::B19200;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Blocking access to one Modbus bus.
pub trait Transport {
    /// Selects the slave addressed by subsequent requests. Performs no I/O.
    fn set_slave(&mut self, address: u8);

    /// Sets how long each request waits for its reply.
    fn set_timeout(&mut self, timeout: Duration);

    /// Reads exactly `count` holding registers starting at `start`.
    fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> std::result::Result<Vec<u16>, TransportError>;

    /// Writes `values` to consecutive holding registers starting at `start`.
    fn write_registers(
        &mut self,
        start: u16,
        values: &[u16],
    ) -> std::result::Result<(), TransportError>;

    /// Writes a single coil.
    fn write_coil(&mut self, address: u16, value: bool)
        -> std::result::Result<(), TransportError>;
}

/// Serial line configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Serial port path or name (`/dev/ttyUSB0`, `COM3`).
    pub port: String,
    /// Line baudrate.
    pub baudrate: Baudrate,
    /// Line parity. Data bits (8) and stop bits (1) are fixed.
    pub parity: Parity,
    /// Initial per-request timeout; bus operations override it.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Creates a configuration for `port` with 19200 baud, no parity, 8N1.
    ///
    /// # Example
    ///
    /// ```
    /// use neuron_ext::{Baudrate, Parity, SerialConfig};
    ///
    /// let config = SerialConfig::new("/dev/ttyUSB0");
    /// assert_eq!(config.baudrate, Baudrate::B19200);
    /// assert_eq!(config.parity, Parity::None);
    /// ```
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baudrate: DEFAULT_BAUDRATE,
            parity: Parity::None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the line baudrate.
    pub fn with_baudrate(mut self, baudrate: Baudrate) -> Self {
        self.baudrate = baudrate;
        self
    }

    /// Sets the line parity.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Sets the initial request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn serial_port_builder(&self) -> tokio_serial::SerialPortBuilder {
        tokio_serial::new(self.port.as_str(), self.baudrate.as_u32())
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(self.parity.into())
            .timeout(self.timeout)
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// Modbus RTU transport over a serial line.
pub struct RtuTransport {
    ctx: Context,
    port: String,
    slave: u8,
}

impl RtuTransport {
    /// Opens the serial line described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `NeuronError::Connection` if the port cannot be opened or configured.
    pub fn connect(config: &SerialConfig) -> Result<Self> {
        let builder = config.serial_port_builder();
        let mut ctx = tokio_modbus::client::sync::rtu::connect_slave(&builder, Slave(1))
            .map_err(|e| NeuronError::connection(config.port.as_str(), e.to_string()))?;
        ctx.set_timeout(Some(config.timeout));

        log::debug!(
            "Opened {} at {} baud, parity {}",
            config.port,
            config.baudrate,
            config.parity
        );

        Ok(Self {
            ctx,
            port: config.port.clone(),
            slave: 1,
        })
    }

    /// Returns the serial port this transport was opened on.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Returns the currently selected slave address.
    pub fn slave(&self) -> u8 {
        self.slave
    }
}

/// Flattens the nested tokio-modbus result into a transport error.
fn map_modbus_result<T>(result: tokio_modbus::Result<T>) -> std::result::Result<T, TransportError> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(exception)) => Err(TransportError::Exception(format!("{exception:?}"))),
        Err(tokio_modbus::Error::Transport(err)) => Err(map_io_error(err)),
        Err(err) => Err(TransportError::Protocol(err.to_string())),
    }
}

fn map_io_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
        _ => TransportError::Io(err),
    }
}

/// Rejects replies carrying the wrong number of registers.
pub(crate) fn check_len(
    values: Vec<u16>,
    expected: u16,
) -> std::result::Result<Vec<u16>, TransportError> {
    if values.len() != usize::from(expected) {
        return Err(TransportError::ShortResponse {
            expected: usize::from(expected),
            received: values.len(),
        });
    }
    Ok(values)
}

impl Transport for RtuTransport {
    fn set_slave(&mut self, address: u8) {
        self.slave = address;
        self.ctx.set_slave(Slave(address));
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.ctx.set_timeout(Some(timeout));
    }

    fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> std::result::Result<Vec<u16>, TransportError> {
        let values = map_modbus_result(self.ctx.read_holding_registers(start, count))?;
        check_len(values, count)
    }

    fn write_registers(
        &mut self,
        start: u16,
        values: &[u16],
    ) -> std::result::Result<(), TransportError> {
        map_modbus_result(self.ctx.write_multiple_registers(start, values))
    }

    fn write_coil(
        &mut self,
        address: u16,
        value: bool,
    ) -> std::result::Result<(), TransportError> {
        map_modbus_result(self.ctx.write_single_coil(address, value))
    }
}

impl std::fmt::Debug for RtuTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtuTransport")
            .field("port", &self.port)
            .field("slave", &self.slave)
            .finish_non_exhaustive()
    }
}

/// Scripted in-memory transport for unit tests.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    /// One request seen by the mock.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Read { slave: u8, start: u16, count: u16 },
        WriteRegisters { slave: u8, start: u16, values: Vec<u16> },
        WriteCoil { slave: u8, address: u16, value: bool },
    }

    type Responder = Box<dyn FnMut(&Call) -> std::result::Result<Vec<u16>, TransportError>>;

    /// Answers every request through a closure and records it.
    pub(crate) struct MockTransport {
        pub(crate) slave: u8,
        pub(crate) timeout: Option<Duration>,
        pub(crate) calls: Vec<Call>,
        responder: Responder,
    }

    impl MockTransport {
        pub(crate) fn new(
            responder: impl FnMut(&Call) -> std::result::Result<Vec<u16>, TransportError> + 'static,
        ) -> Self {
            Self {
                slave: 0,
                timeout: None,
                calls: Vec::new(),
                responder: Box::new(responder),
            }
        }

        /// A bus where nobody answers.
        pub(crate) fn silent() -> Self {
            Self::new(|_| Err(TransportError::Timeout))
        }

        /// A bus with one device at `address` reporting `model_id`.
        pub(crate) fn single_device(address: u8, model_id: u16) -> Self {
            Self::new(move |call| match call {
                Call::Read { slave, start, count } if *slave == address => {
                    let block = [0x0102, 0x0304, 0x0506, 0x0708, model_id, 0x5678, 0x1234];
                    let offset = usize::from(start - crate::device::IDENTIFICATION_BLOCK_START);
                    Ok(block[offset..offset + usize::from(*count)].to_vec())
                }
                Call::WriteRegisters { slave, .. } | Call::WriteCoil { slave, .. }
                    if *slave == address =>
                {
                    Ok(Vec::new())
                }
                _ => Err(TransportError::Timeout),
            })
        }

        pub(crate) fn reads(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Read { .. }))
                .count()
        }

        pub(crate) fn writes(&self) -> usize {
            self.calls.len() - self.reads()
        }

        fn dispatch(&mut self, call: Call) -> std::result::Result<Vec<u16>, TransportError> {
            let result = (self.responder)(&call);
            self.calls.push(call);
            result
        }
    }

    impl Transport for MockTransport {
        fn set_slave(&mut self, address: u8) {
            self.slave = address;
        }

        fn set_timeout(&mut self, timeout: Duration) {
            self.timeout = Some(timeout);
        }

        fn read_holding_registers(
            &mut self,
            start: u16,
            count: u16,
        ) -> std::result::Result<Vec<u16>, TransportError> {
            let call = Call::Read {
                slave: self.slave,
                start,
                count,
            };
            check_len(self.dispatch(call)?, count)
        }

        fn write_registers(
            &mut self,
            start: u16,
            values: &[u16],
        ) -> std::result::Result<(), TransportError> {
            let call = Call::WriteRegisters {
                slave: self.slave,
                start,
                values: values.to_vec(),
            };
            self.dispatch(call).map(|_| ())
        }

        fn write_coil(
            &mut self,
            address: u16,
            value: bool,
        ) -> std::result::Result<(), TransportError> {
            let call = Call::WriteCoil {
                slave: self.slave,
                address,
                value,
            };
            self.dispatch(call).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{Call, MockTransport};
    use super::*;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_BAUDRATE, Baudrate::B19200);
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_millis(200));
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyUSB0")
            .with_baudrate(Baudrate::B115200)
            .with_parity(Parity::Even)
            .with_timeout(Duration::from_secs(1));

        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baudrate, Baudrate::B115200);
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_parity_to_serial() {
        assert_eq!(
            tokio_serial::Parity::from(Parity::None),
            tokio_serial::Parity::None
        );
        assert_eq!(
            tokio_serial::Parity::from(Parity::Even),
            tokio_serial::Parity::Even
        );
        assert_eq!(
            tokio_serial::Parity::from(Parity::Odd),
            tokio_serial::Parity::Odd
        );
    }

    #[test]
    fn test_connect_missing_port_is_connection_error() {
        let config = SerialConfig::new("/dev/neuron-ext-no-such-port");
        let err = RtuTransport::connect(&config).unwrap_err();
        assert!(matches!(err, NeuronError::Connection { .. }));
    }

    #[test]
    fn test_check_len() {
        assert_eq!(check_len(vec![1, 2], 2).unwrap(), vec![1, 2]);
        assert!(matches!(
            check_len(vec![1], 2),
            Err(TransportError::ShortResponse {
                expected: 2,
                received: 1
            })
        ));
    }

    #[test]
    fn test_map_io_error_timeout() {
        let err = map_io_error(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
        assert!(matches!(err, TransportError::Timeout));
        let err = map_io_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn test_map_modbus_result() {
        use tokio_modbus::{ExceptionCode, ProtocolError, Response};

        let ok: tokio_modbus::Result<Vec<u16>> = Ok(Ok(vec![5]));
        assert_eq!(map_modbus_result(ok).unwrap(), vec![5]);

        let exception: tokio_modbus::Result<Vec<u16>> =
            Ok(Err(ExceptionCode::IllegalDataAddress));
        match map_modbus_result(exception) {
            Err(TransportError::Exception(code)) => assert_eq!(code, "IllegalDataAddress"),
            other => panic!("expected exception, got {other:?}"),
        }

        let timeout: tokio_modbus::Result<Vec<u16>> = Err(tokio_modbus::Error::Transport(
            io::Error::new(io::ErrorKind::TimedOut, "timeout"),
        ));
        assert!(matches!(
            map_modbus_result(timeout),
            Err(TransportError::Timeout)
        ));

        let mismatch: tokio_modbus::Result<Vec<u16>> =
            Err(tokio_modbus::Error::Protocol(ProtocolError::HeaderMismatch {
                message: "unexpected slave".into(),
                result: Ok(Response::ReadHoldingRegisters(vec![5])),
            }));
        assert!(matches!(
            map_modbus_result(mismatch),
            Err(TransportError::Protocol(_))
        ));
    }

    #[test]
    fn test_mock_records_slave_per_call() {
        let mut transport = MockTransport::single_device(3, 5);
        transport.set_slave(3);
        let block = transport.read_holding_registers(1000, 7).unwrap();
        assert_eq!(block[4], 5);
        transport.set_slave(4);
        assert!(transport.read_holding_registers(1000, 7).is_err());
        assert_eq!(
            transport.calls[1],
            Call::Read {
                slave: 4,
                start: 1000,
                count: 7
            }
        );
    }
}
