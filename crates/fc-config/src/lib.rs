//! fc-config: the rig's I/O record (`config.json`) and gas catalog (`gases.toml`).

use std::path::{Path, PathBuf};

use tracing::warn;

pub mod paths;
pub mod schema;
pub mod validate;

pub use paths::{
    DEFAULT_CONFIG_FILE, DEFAULT_GASES_FILE, convert_com_port, find_config_file,
    resolve_config_files,
};
pub use schema::{GasCatalog, GasDef, IoConfig};
pub use validate::{ValidationError, incomplete_pairs, validate_catalog};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Missing configuration key: {0}")]
    MissingKey(&'static str),

    #[error("Configuration file '{name}' not found (searched {searched:?})")]
    NotFound { name: String, searched: Vec<PathBuf> },
}

fn read(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_io_config(content: &str) -> ConfigResult<IoConfig> {
    let io: IoConfig = serde_json::from_str(content)?;
    for issue in incomplete_pairs(&io) {
        warn!("{issue}");
    }
    Ok(io)
}

pub fn load_io_config(path: &Path) -> ConfigResult<IoConfig> {
    parse_io_config(&read(path)?)
}

pub fn parse_gas_catalog(content: &str) -> ConfigResult<GasCatalog> {
    let catalog: GasCatalog = toml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

pub fn load_gas_catalog(path: &Path) -> ConfigResult<GasCatalog> {
    parse_gas_catalog(&read(path)?)
}
