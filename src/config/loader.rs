//! Charm configuration loading from disk.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use super::schema::CharmConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load the charm configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<CharmConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: CharmConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load the charm configuration, falling back to defaults when the file
/// does not exist. Malformed files are still an error: silently ignoring
/// operator input would be worse than failing the hook.
pub fn load_or_default(path: &Path) -> Result<CharmConfig, ConfigError> {
    match load_config(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "No charm config file, using defaults");
            Ok(CharmConfig::default())
        }
        Err(err) => Err(err),
    }
}
