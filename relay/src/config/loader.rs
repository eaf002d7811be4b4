use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "RELAY_CONFIG";

/// `$RELAY_CONFIG` if set, otherwise `default`.
pub fn config_path(default: &str) -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Loads a TOML config, falling back to defaults when the file does not exist.
pub async fn load_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let exists = fs::try_exists(path)
        .await
        .map_err(|e| anyhow!("Failed to access config {}: {}", path.display(), e))?;

    if !exists {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(T::default());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;

    let config: T = toml::from_str(&content)
        .map_err(|e| anyhow!("Failed to parse config {}: {}", path.display(), e))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
