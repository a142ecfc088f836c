//! Serial line settings and the packed configuration word.
//!
//! A Neuron extension keeps its bus settings in two consecutive holding
//! registers starting at the model's configuration base register:
//!
//! | Offset | Content |
//! |-------:|---------|
//! | 0 | [`ConfigWord`]: baudrate code and parity flags |
//! | 1 | New slave address, verbatim |
//!
//! # Configuration word layout
//!
//! | Bits | Meaning |
//! |------|---------|
//! | 0-12 | Baudrate device code (see [`Baudrate::code`]) |
//! | 13 | Parity enabled (even or odd) |
//! | 14 | Odd parity (only together with bit 13) |
//!
//! # Example
//!
//! ```
//! use neuron_ext::{Baudrate, ConfigWord, DeviceSettings, Parity};
//!
//! let word = ConfigWord::encode(Baudrate::B19200, Parity::Even);
//! assert_eq!(word.value(), 14 | (1 << 13));
//!
//! let settings = DeviceSettings::new(12, Baudrate::B115200, Parity::None)?;
//! assert_eq!(settings.registers(), [4098, 12]);
//!
//! // Address 256 does not fit on the bus
//! assert!(DeviceSettings::new(256, Baudrate::B9600, Parity::None).is_err());
//! # Ok::<(), neuron_ext::NeuronError>(())
//! ```

use std::str::FromStr;

use crate::error::{NeuronError, Result};

/// Bit set in the configuration word when parity is enabled.
pub const PARITY_ENABLE_BIT: u8 = 13;

/// Bit set in the configuration word, together with bit 13, for odd parity.
pub const PARITY_ODD_BIT: u8 = 14;

const BAUDRATE_CODE_MASK: u16 = (1 << PARITY_ENABLE_BIT) - 1;

/// Lowest valid slave address.
pub const MIN_SLAVE_ADDRESS: u16 = 1;

/// Highest valid slave address.
pub const MAX_SLAVE_ADDRESS: u16 = 255;

#[inline]
fn bit_is_set(value: u16, bit: u8) -> bool {
    value & (1 << bit) != 0
}

/// Validates a slave address and narrows it to `u8`.
pub(crate) fn validate_address(parameter: &str, address: u16) -> Result<u8> {
    if !(MIN_SLAVE_ADDRESS..=MAX_SLAVE_ADDRESS).contains(&address) {
        return Err(NeuronError::configuration(
            parameter,
            format!("{address} is outside the slave address range 1..=255"),
        ));
    }
    Ok(address as u8)
}

/// Serial parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

impl FromStr for Parity {
    type Err = NeuronError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "even" => Ok(Parity::Even),
            "odd" => Ok(Parity::Odd),
            _ => Err(NeuronError::configuration(
                "parity",
                format!("'{s}' is not supported, must be 'even', 'odd' or 'none'"),
            )),
        }
    }
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::None => write!(f, "none"),
            Parity::Even => write!(f, "even"),
            Parity::Odd => write!(f, "odd"),
        }
    }
}

/// Baudrates supported by Neuron extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Baudrate {
    /// 2400 baud.
    B2400,
    /// 4800 baud.
    B4800,
    /// 9600 baud.
    B9600,
    /// 19200 baud.
    B19200,
    /// 38400 baud.
    B38400,
    /// 57600 baud.
    B57600,
    /// 115200 baud.
    B115200,
}

impl Baudrate {
    /// All supported baudrates, slowest first.
    pub const ALL: [Baudrate; 7] = [
        Baudrate::B2400,
        Baudrate::B4800,
        Baudrate::B9600,
        Baudrate::B19200,
        Baudrate::B38400,
        Baudrate::B57600,
        Baudrate::B115200,
    ];

    /// Returns the line rate in bits per second.
    pub fn as_u32(self) -> u32 {
        match self {
            Baudrate::B2400 => 2400,
            Baudrate::B4800 => 4800,
            Baudrate::B9600 => 9600,
            Baudrate::B19200 => 19200,
            Baudrate::B38400 => 38400,
            Baudrate::B57600 => 57600,
            Baudrate::B115200 => 115200,
        }
    }

    /// Returns the code the device firmware expects in the configuration word.
    pub fn code(self) -> u16 {
        match self {
            Baudrate::B2400 => 11,
            Baudrate::B4800 => 12,
            Baudrate::B9600 => 13,
            Baudrate::B19200 => 14,
            Baudrate::B38400 => 15,
            Baudrate::B57600 => 4097,
            Baudrate::B115200 => 4098,
        }
    }

    /// Looks up the baudrate for a device code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.code() == code)
    }
}

impl TryFrom<u32> for Baudrate {
    type Error = NeuronError;

    fn try_from(rate: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_u32() == rate)
            .ok_or_else(|| {
                NeuronError::configuration(
                    "baudrate",
                    format!("{rate} is not supported by Neuron extensions"),
                )
            })
    }
}

impl FromStr for Baudrate {
    type Err = NeuronError;

    fn from_str(s: &str) -> Result<Self> {
        let rate: u32 = s.trim().parse().map_err(|_| {
            NeuronError::configuration("baudrate", format!("'{s}' is not a number"))
        })?;
        Self::try_from(rate)
    }
}

impl std::fmt::Display for Baudrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Packed baudrate and parity, as stored in the first configuration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigWord(u16);

impl ConfigWord {
    /// Packs a baudrate and parity into a configuration word.
    ///
    /// # Example
    ///
    /// ```
    /// use neuron_ext::{Baudrate, ConfigWord, Parity};
    ///
    /// assert_eq!(ConfigWord::encode(Baudrate::B9600, Parity::None).value(), 0x000D);
    /// assert_eq!(ConfigWord::encode(Baudrate::B9600, Parity::Even).value(), 0x200D);
    /// assert_eq!(ConfigWord::encode(Baudrate::B9600, Parity::Odd).value(), 0x600D);
    /// ```
    pub fn encode(baudrate: Baudrate, parity: Parity) -> Self {
        let mut value = baudrate.code();
        if parity != Parity::None {
            value |= 1 << PARITY_ENABLE_BIT;
            if parity == Parity::Odd {
                value |= 1 << PARITY_ODD_BIT;
            }
        }
        Self(value)
    }

    /// Unpacks a configuration word read back from a device.
    ///
    /// # Errors
    ///
    /// Returns `NeuronError::Configuration` if the baudrate code is unknown or
    /// the odd-parity flag is set without the parity-enable flag.
    pub fn decode(value: u16) -> Result<(Baudrate, Parity)> {
        let code = value & BAUDRATE_CODE_MASK;
        let baudrate = Baudrate::from_code(code).ok_or_else(|| {
            NeuronError::configuration("config word", format!("unknown baudrate code {code}"))
        })?;
        let parity = match (
            bit_is_set(value, PARITY_ENABLE_BIT),
            bit_is_set(value, PARITY_ODD_BIT),
        ) {
            (false, false) => Parity::None,
            (true, false) => Parity::Even,
            (true, true) => Parity::Odd,
            (false, true) => {
                return Err(NeuronError::configuration(
                    "config word",
                    format!("0x{value:04X} sets odd parity without enabling parity"),
                ))
            }
        };
        Ok((baudrate, parity))
    }

    /// Returns the raw register value.
    pub fn value(self) -> u16 {
        self.0
    }
}

impl From<ConfigWord> for u16 {
    fn from(word: ConfigWord) -> u16 {
        word.0
    }
}

/// New bus settings for a device.
///
/// Only constructible through [`DeviceSettings::new`], which guarantees the
/// target address is a valid slave address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSettings {
    target_address: u8,
    baudrate: Baudrate,
    parity: Parity,
}

impl DeviceSettings {
    /// Creates validated device settings.
    ///
    /// # Errors
    ///
    /// Returns `NeuronError::Configuration` if `target_address` is not in `1..=255`.
    pub fn new(target_address: u16, baudrate: Baudrate, parity: Parity) -> Result<Self> {
        let target_address = validate_address("target address", target_address)?;
        Ok(Self {
            target_address,
            baudrate,
            parity,
        })
    }

    /// Creates device settings from the textual forms used on command lines.
    ///
    /// # Errors
    ///
    /// Returns `NeuronError::Configuration` for an invalid address, an
    /// unsupported baudrate or an unknown parity name.
    pub fn parse(target_address: u16, baudrate: u32, parity: &str) -> Result<Self> {
        Self::new(target_address, Baudrate::try_from(baudrate)?, parity.parse()?)
    }

    /// Returns the slave address the device will answer on.
    pub fn target_address(&self) -> u8 {
        self.target_address
    }

    /// Returns the new baudrate.
    pub fn baudrate(&self) -> Baudrate {
        self.baudrate
    }

    /// Returns the new parity.
    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Returns the packed configuration word.
    pub fn config_word(&self) -> ConfigWord {
        ConfigWord::encode(self.baudrate, self.parity)
    }

    /// Returns the two register values written at the configuration base.
    pub fn registers(&self) -> [u16; 2] {
        [self.config_word().value(), u16::from(self.target_address)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baudrate_codes() {
        assert_eq!(Baudrate::B2400.code(), 11);
        assert_eq!(Baudrate::B4800.code(), 12);
        assert_eq!(Baudrate::B9600.code(), 13);
        assert_eq!(Baudrate::B19200.code(), 14);
        assert_eq!(Baudrate::B38400.code(), 15);
        assert_eq!(Baudrate::B57600.code(), 4097);
        assert_eq!(Baudrate::B115200.code(), 4098);
    }

    #[test]
    fn test_baudrate_try_from() {
        assert_eq!(Baudrate::try_from(19200).unwrap(), Baudrate::B19200);
        assert_eq!(Baudrate::try_from(115200).unwrap(), Baudrate::B115200);
        assert!(matches!(
            Baudrate::try_from(1200),
            Err(NeuronError::Configuration { .. })
        ));
        assert!("57600".parse::<Baudrate>().is_ok());
        assert!("fast".parse::<Baudrate>().is_err());
    }

    #[test]
    fn test_parity_from_str() {
        assert_eq!("none".parse::<Parity>().unwrap(), Parity::None);
        assert_eq!("even".parse::<Parity>().unwrap(), Parity::Even);
        assert_eq!("ODD".parse::<Parity>().unwrap(), Parity::Odd);
        let err = "mark".parse::<Parity>().unwrap_err();
        assert!(matches!(err, NeuronError::Configuration { .. }));
    }

    #[test]
    fn test_encode_parity_bits() {
        for baudrate in Baudrate::ALL {
            let none = ConfigWord::encode(baudrate, Parity::None).value();
            let even = ConfigWord::encode(baudrate, Parity::Even).value();
            let odd = ConfigWord::encode(baudrate, Parity::Odd).value();

            assert!(!bit_is_set(none, 13) && !bit_is_set(none, 14));
            assert!(bit_is_set(even, 13) && !bit_is_set(even, 14));
            assert!(bit_is_set(odd, 13) && bit_is_set(odd, 14));

            for word in [none, even, odd] {
                assert_eq!(word & BAUDRATE_CODE_MASK, baudrate.code());
            }
        }
    }

    #[test]
    fn test_encode_high_baudrate_code_keeps_bit_12() {
        let word = ConfigWord::encode(Baudrate::B57600, Parity::Odd);
        assert_eq!(word.value(), 0x1001 | 0x2000 | 0x4000);
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            ConfigWord::decode(0x600D).unwrap(),
            (Baudrate::B9600, Parity::Odd)
        );
        assert_eq!(
            ConfigWord::decode(0x1002).unwrap(),
            (Baudrate::B115200, Parity::None)
        );
        assert!(ConfigWord::decode(0x400D).is_err());
        assert!(ConfigWord::decode(0x0001).is_err());
    }

    #[test]
    fn test_device_settings_address_range() {
        assert!(DeviceSettings::new(1, Baudrate::B9600, Parity::None).is_ok());
        assert!(DeviceSettings::new(255, Baudrate::B9600, Parity::None).is_ok());
        assert!(matches!(
            DeviceSettings::new(0, Baudrate::B9600, Parity::None),
            Err(NeuronError::Configuration { .. })
        ));
        assert!(matches!(
            DeviceSettings::new(256, Baudrate::B9600, Parity::None),
            Err(NeuronError::Configuration { .. })
        ));
    }

    #[test]
    fn test_device_settings_registers() {
        let settings = DeviceSettings::new(7, Baudrate::B19200, Parity::Even).unwrap();
        assert_eq!(settings.target_address(), 7);
        assert_eq!(settings.registers(), [0x200E, 7]);
    }

    #[test]
    fn test_device_settings_parse() {
        let settings = DeviceSettings::parse(3, 38400, "odd").unwrap();
        assert_eq!(settings.baudrate(), Baudrate::B38400);
        assert_eq!(settings.parity(), Parity::Odd);
        assert!(DeviceSettings::parse(3, 38401, "odd").is_err());
        assert!(DeviceSettings::parse(3, 38400, "space").is_err());
    }
}
