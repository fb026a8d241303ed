//! Error types for the rig service layer.

/// Unified error for everything a front end can ask the rig to do.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Rig error: {0}")]
    Rig(#[from] fc_core::FcError),

    #[error("Configuration error: {0}")]
    Config(#[from] fc_config::ConfigError),

    #[error("Temperature controller error: {0}")]
    Thermal(#[from] fc_thermal::ThermalError),

    #[error("Flow controller error: {0}")]
    Flow(#[from] fc_flow::FlowError),

    #[error("Unknown gas: {0}")]
    UnknownGas(String),

    #[error("Gas {0} has no valve settings")]
    GasNotRouted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for fc-app operations.
pub type AppResult<T> = Result<T, AppError>;
