//! Locating configuration files and naming serial devices.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ConfigError, ConfigResult};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_GASES_FILE: &str = "gases.toml";

/// Directories, relative to the project root, searched for configuration.
/// Site files in `config/` win over the shipped samples in `demos/`.
pub const SEARCH_DIRS: [&str; 2] = ["config", "demos"];

/// First `dir/name` that exists.
pub fn find_config_file(name: &Path, search_paths: &[PathBuf]) -> Option<PathBuf> {
    search_paths
        .iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn search_paths(root: &Path, include_root: bool) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(SEARCH_DIRS.len() + 1);
    if include_root {
        paths.push(root.to_path_buf());
    }
    paths.extend(SEARCH_DIRS.iter().map(|d| root.join(d)));
    paths
}

fn locate(name: &Path, paths: &[PathBuf]) -> ConfigResult<PathBuf> {
    find_config_file(name, paths).ok_or_else(|| ConfigError::NotFound {
        name: name.display().to_string(),
        searched: paths.to_vec(),
    })
}

/// Resolve the I/O record and gas catalog paths.
///
/// Paths that both exist are used as given. Otherwise default names are
/// searched in `config/` then `demos/` under `root`, and custom names also in
/// `root` itself.
pub fn resolve_config_files(
    config: &Path,
    gases: &Path,
    root: &Path,
) -> ConfigResult<(PathBuf, PathBuf)> {
    if config.is_file() && gases.is_file() {
        return Ok((config.to_path_buf(), gases.to_path_buf()));
    }
    let defaults = config == Path::new(DEFAULT_CONFIG_FILE) && gases == Path::new(DEFAULT_GASES_FILE);
    let paths = search_paths(root, !defaults);
    let config_path = locate(config, &paths)?;
    let gases_path = locate(gases, &paths)?;
    debug!(config = %config_path.display(), gases = %gases_path.display(), "resolved configuration");
    Ok((config_path, gases_path))
}

/// Map a Windows `COMn` name to the host's device path.
pub fn convert_com_port(port: &str) -> String {
    com_port_for(port, cfg!(windows))
}

fn com_port_for(port: &str, windows: bool) -> String {
    if windows {
        return port.to_string();
    }
    let number = port
        .get(..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("COM"))
        .and_then(|_| port[3..].parse::<u32>().ok())
        .filter(|n| *n >= 1);
    match number {
        Some(n) => format!("/dev/ttyS{}", n - 1),
        None => port.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn any_com_number_maps_one_lower(n in 1u32..1000) {
            prop_assert_eq!(com_port_for(&format!("COM{n}"), false), format!("/dev/ttyS{}", n - 1));
        }
    }

    #[test]
    fn com_names_map_to_tty() {
        assert_eq!(com_port_for("COM1", false), "/dev/ttyS0");
        assert_eq!(com_port_for("com4", false), "/dev/ttyS3");
        assert_eq!(com_port_for("COM12", false), "/dev/ttyS11");
    }

    #[test]
    fn other_names_pass_through() {
        assert_eq!(com_port_for("/dev/ttyUSB0", false), "/dev/ttyUSB0");
        assert_eq!(com_port_for("COM0", false), "COM0");
        assert_eq!(com_port_for("COMX", false), "COMX");
        assert_eq!(com_port_for("COM3", true), "COM3");
    }

    #[test]
    fn missing_file_lists_search_path() {
        let root = Path::new("/nonexistent-rig-root");
        let err = resolve_config_files(
            Path::new(DEFAULT_CONFIG_FILE),
            Path::new(DEFAULT_GASES_FILE),
            root,
        )
        .unwrap_err();
        match err {
            ConfigError::NotFound { name, searched } => {
                assert_eq!(name, DEFAULT_CONFIG_FILE);
                assert_eq!(searched, vec![root.join("config"), root.join("demos")]);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
