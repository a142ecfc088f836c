//! Error types for Neuron bus operations.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for Neuron bus operations.
pub type Result<T> = std::result::Result<T, NeuronError>;

/// Failure of a single Modbus exchange.
///
/// Transports never retry; callers decide whether a failed exchange means
/// "no device", "one failed cycle" or a hard error.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No reply arrived before the request timeout expired.
    #[error("Request timed out")]
    Timeout,

    /// The device answered with a Modbus exception.
    #[error("Modbus exception: {0}")]
    Exception(String),

    /// The reply frame could not be decoded.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The reply carried a different number of registers than requested.
    #[error("Short response: expected {expected} registers, received {received}")]
    ShortResponse {
        /// Number of registers requested.
        expected: usize,
        /// Number of registers in the reply.
        received: usize,
    },

    /// I/O error on the serial line.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Step of the settings write sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStep {
    /// Reading the model-identification register.
    ReadModel,
    /// Writing the configuration word and target address.
    WriteRegisters,
    /// Setting the commit coil.
    Commit,
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStep::ReadModel => write!(f, "read model id"),
            WriteStep::WriteRegisters => write!(f, "write configuration registers"),
            WriteStep::Commit => write!(f, "commit configuration"),
        }
    }
}

/// Errors that can occur while talking to Neuron extensions.
#[derive(Debug, Error)]
pub enum NeuronError {
    /// The serial line could not be opened or configured.
    #[error("Could not connect to '{port}': {reason}")]
    Connection {
        /// Serial port path or name.
        port: String,
        /// Description of the failure.
        reason: String,
    },

    /// A read exchange failed.
    #[error("Read failed: {0}")]
    Read(#[from] TransportError),

    /// A step of the settings write sequence failed.
    #[error("Write failed at step '{step}': {source}")]
    Write {
        /// The step that failed; later steps were not attempted.
        step: WriteStep,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// The model-ID register holds a value no known model uses.
    #[error("Unrecognized device at address {address}: model id {model_id}")]
    UnrecognizedDevice {
        /// Slave address of the device.
        address: u8,
        /// Raw model-ID register value.
        model_id: u16,
    },

    /// Invalid input, rejected before any I/O.
    #[error("Invalid parameter '{parameter}': {reason}")]
    Configuration {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Discovery range is empty or starts at the broadcast address.
    #[error("Invalid address range {start}..={end}")]
    InvalidRange {
        /// First address of the range.
        start: u8,
        /// Last address of the range.
        end: u8,
    },
}

impl NeuronError {
    /// Creates a new `Connection` error.
    ///
    /// # Example
    ///
    /// ```
    /// use neuron_ext::NeuronError;
    ///
    /// let err = NeuronError::connection("/dev/ttyUSB0", "permission denied");
    /// ```
    pub fn connection(port: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            port: port.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `Configuration` error.
    ///
    /// # Example
    ///
    /// ```
    /// use neuron_ext::NeuronError;
    ///
    /// let err = NeuronError::configuration("address", "must be in range 1..=255");
    /// ```
    pub fn configuration(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `Write` error for the given step.
    pub fn write(step: WriteStep, source: TransportError) -> Self {
        Self::Write { step, source }
    }

    /// Returns `true` if the error was raised before any bus traffic.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            NeuronError::Configuration { .. } | NeuronError::InvalidRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display() {
        let err = NeuronError::configuration("address", "must be in range 1..=255");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'address': must be in range 1..=255"
        );
        assert!(err.is_input_error());
    }

    #[test]
    fn test_write_display_names_step() {
        let err = NeuronError::write(WriteStep::Commit, TransportError::Timeout);
        assert_eq!(
            err.to_string(),
            "Write failed at step 'commit configuration': Request timed out"
        );
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_unrecognized_device_display() {
        let err = NeuronError::UnrecognizedDevice {
            address: 15,
            model_id: 999,
        };
        assert_eq!(
            err.to_string(),
            "Unrecognized device at address 15: model id 999"
        );
    }

    #[test]
    fn test_read_from_transport_error() {
        let err: NeuronError = TransportError::ShortResponse {
            expected: 7,
            received: 3,
        }
        .into();
        assert!(matches!(err, NeuronError::Read(_)));
        assert_eq!(
            err.to_string(),
            "Read failed: Short response: expected 7 registers, received 3"
        );
    }

    #[test]
    fn test_invalid_range_display() {
        let err = NeuronError::InvalidRange { start: 9, end: 3 };
        assert_eq!(err.to_string(), "Invalid address range 9..=3");
        assert!(err.is_input_error());
    }
}
