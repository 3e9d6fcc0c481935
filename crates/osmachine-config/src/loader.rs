use crate::error::{ConfigError, Result};
use crate::model::MachineClass;
use std::path::Path;

/// Load a machine class from a YAML or JSON file, chosen by extension
pub fn load_machine_class(path: &Path) -> Result<MachineClass> {
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let class = match extension.as_str() {
        "yaml" | "yml" => parse_yaml(&content)?,
        "json" => parse_json(&content)?,
        other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
    };

    class.validate()?;
    Ok(class)
}

pub fn parse_yaml(content: &str) -> Result<MachineClass> {
    Ok(serde_yaml::from_str(content)?)
}

pub fn parse_json(content: &str) -> Result<MachineClass> {
    Ok(serde_json::from_str(content)?)
}
