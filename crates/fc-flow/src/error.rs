//! Error types for mass-flow controller communication.

use thiserror::Error;

/// Result type for propar and flow-controller operations.
pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Debug, Error)]
pub enum FlowError {
    /// The instrument answered with a non-zero propar status.
    #[error("Node {node} returned status {code:#04x} at byte {index}")]
    Status { node: u8, code: u8, index: u8 },

    /// A message did not have the expected shape.
    #[error("Malformed propar message: {what}")]
    Frame { what: String },

    #[error("Transport error: {what}")]
    Transport { what: String },

    #[error("{gas}: {flow} outside the controller range [{low}, {high}]")]
    OutOfRange {
        gas: String,
        flow: f64,
        low: f64,
        high: f64,
    },

    #[error("{gas} has no {field} in the gas catalog")]
    Incomplete { gas: String, field: &'static str },

    #[error("Unknown gas: {0}")]
    UnknownGas(String),

    #[error("Gas {0} does not belong to any flow line")]
    NotOnLine(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    pub(crate) fn frame(what: impl Into<String>) -> Self {
        FlowError::Frame { what: what.into() }
    }
}
