//! Neuron extension models and their register map.
//!
//! Every known model is listed once in [`MODEL_TABLE`] together with the value
//! it reports in the model-ID register and the holding register where its
//! configuration block starts. Discovery and the settings writer both consult
//! this table.
//!
//! # Models
//!
//! | Model | Model ID | Config base register |
//! |-------|---------:|---------------------:|
//! | xS10 | 1 | 1031 |
//! | xS11 | 272 | 1027 |
//! | xS30 | 784 | 1034 |
//! | xS40 | 528 | 1023 |
//! | xS50 | 5 | 1023 |
//! | xS51 | 273 | 1023 |
//!
//! # Example
//!
//! ```
//! use neuron_ext::{classify, DeviceModel};
//!
//! let model = classify(5).unwrap();
//! assert_eq!(model, DeviceModel::XS50);
//! assert_eq!(model.config_base_register(), 1023);
//! assert_eq!(model.to_string(), "xS50");
//!
//! assert!(classify(999).is_none());
//! ```

/// First holding register of the identification block.
pub const IDENTIFICATION_BLOCK_START: u16 = 1000;

/// Number of registers in the identification block.
pub const IDENTIFICATION_BLOCK_LEN: u16 = 7;

/// Holding register carrying the model ID.
pub const MODEL_ID_REGISTER: u16 = 1004;

/// Position of the model ID inside the identification block.
pub const MODEL_ID_INDEX: usize = (MODEL_ID_REGISTER - IDENTIFICATION_BLOCK_START) as usize;

/// Position of the low serial number word inside the identification block.
pub const SERIAL_LOW_INDEX: usize = 5;

/// Position of the high serial number word inside the identification block.
pub const SERIAL_HIGH_INDEX: usize = 6;

/// Coil that stores pending configuration to non-volatile memory and applies it.
pub const COMMIT_COIL: u16 = 1003;

/// Neuron extension model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceModel {
    /// xS10 extension.
    XS10,
    /// xS11 extension.
    XS11,
    /// xS30 extension.
    XS30,
    /// xS40 extension.
    XS40,
    /// xS50 extension.
    XS50,
    /// xS51 extension.
    XS51,
}

/// Model, model ID and configuration base register for every known extension.
pub const MODEL_TABLE: [(DeviceModel, u16, u16); 6] = [
    (DeviceModel::XS10, 1, 1031),
    (DeviceModel::XS11, 272, 1027),
    (DeviceModel::XS30, 784, 1034),
    (DeviceModel::XS40, 528, 1023),
    (DeviceModel::XS50, 5, 1023),
    (DeviceModel::XS51, 273, 1023),
];

impl DeviceModel {
    /// All known models, in table order.
    pub const ALL: [DeviceModel; 6] = [
        DeviceModel::XS10,
        DeviceModel::XS11,
        DeviceModel::XS30,
        DeviceModel::XS40,
        DeviceModel::XS50,
        DeviceModel::XS51,
    ];

    // Rows are in declaration order.
    fn entry(self) -> (DeviceModel, u16, u16) {
        MODEL_TABLE[self as usize]
    }

    /// Looks up the model reporting `model_id`, or `None` for unknown values.
    pub fn from_model_id(model_id: u16) -> Option<Self> {
        MODEL_TABLE
            .iter()
            .find(|(_, id, _)| *id == model_id)
            .map(|(model, _, _)| *model)
    }

    /// Returns the value this model reports in the model-ID register.
    pub fn model_id(self) -> u16 {
        self.entry().1
    }

    /// Returns the first of the two configuration holding registers.
    ///
    /// The register at this address takes the packed baudrate/parity word,
    /// the following one takes the new slave address.
    pub fn config_base_register(self) -> u16 {
        self.entry().2
    }

    /// Returns the model name as printed on the device.
    pub fn name(self) -> &'static str {
        match self {
            DeviceModel::XS10 => "xS10",
            DeviceModel::XS11 => "xS11",
            DeviceModel::XS30 => "xS30",
            DeviceModel::XS40 => "xS40",
            DeviceModel::XS50 => "xS50",
            DeviceModel::XS51 => "xS51",
        }
    }
}

impl std::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies a raw model-ID register value.
///
/// Returns `None` for values no known model reports; callers skip such
/// devices during discovery and refuse to configure them.
pub fn classify(model_id: u16) -> Option<DeviceModel> {
    DeviceModel::from_model_id(model_id)
}

/// Extracts the serial number from an identification block.
pub(crate) fn serial_number(block: &[u16]) -> Option<u32> {
    let low = *block.get(SERIAL_LOW_INDEX)?;
    let high = *block.get(SERIAL_HIGH_INDEX)?;
    Some((u32::from(high) << 16) | u32::from(low))
}
