use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "machine config file not found. Checked:\n\
        - $OSM_CONFIG_PATH\n\
        - current directory: machine.yaml, machine.yml, machine.json\n\
        - ~/.config/osmachine/machine.yaml"
    )]
    ConfigFileNotFound,

    #[error("unsupported config format: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),

    #[error("invalid machine config: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
