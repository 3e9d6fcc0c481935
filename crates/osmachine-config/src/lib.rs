pub mod error;
pub mod loader;
pub mod model;

pub use error::*;
pub use loader::{load_machine_class, parse_json, parse_yaml};
pub use model::{
    CLUSTER_TAG_MARKER, DriverSettings, MachineClass, MachineProviderConfig, NetworkConfig,
    NetworkMode, ROLE_TAG_MARKER,
};

use std::path::PathBuf;

/// Environment variable pointing directly at a machine config file
pub const CONFIG_PATH_ENV: &str = "OSM_CONFIG_PATH";

const CANDIDATES: [&str; 3] = ["machine.yaml", "machine.yml", "machine.json"];

/// Locate the machine config file
///
/// Search order:
/// 1. `OSM_CONFIG_PATH`
/// 2. current directory: machine.yaml, machine.yml, machine.json
/// 3. ~/.config/osmachine/machine.yaml
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("osmachine").join("machine.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}
