//! Error types for temperature-controller communication.

use thiserror::Error;

/// Result type for Modbus and controller operations.
pub type ThermalResult<T> = Result<T, ThermalError>;

#[derive(Debug, Error)]
pub enum ThermalError {
    /// The slave answered with an exception response.
    #[error("Modbus exception {code:#04x} for function {function:#04x}")]
    Exception { function: u8, code: u8 },

    /// A frame or PDU did not have the expected shape.
    #[error("Malformed frame: {what}")]
    Frame { what: String },

    #[error("CRC mismatch: computed {computed:#06x}, received {received:#06x}")]
    Crc { computed: u16, received: u16 },

    #[error("Transport error: {what}")]
    Transport { what: String },

    #[error("Value out of range: {what}")]
    OutOfRange { what: String },

    #[error("Write to register {register} failed after {attempts} attempts: {last}")]
    WriteFailed {
        register: u16,
        attempts: u32,
        last: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ThermalError {
    pub(crate) fn frame(what: impl Into<String>) -> Self {
        ThermalError::Frame { what: what.into() }
    }
}
