use thiserror::Error;

pub type FcResult<T> = Result<T, FcError>;

#[derive(Error, Debug)]
pub enum FcError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Protocol error: {what}")]
    Protocol { what: String },

    #[error("Transport error: {what}")]
    Transport { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
