use std::path::{Path, PathBuf};
use tracing::info;

use quip_core::{QuipError, Result};

use crate::schema::QuipConfig;

/// Resolve the config path: explicit path > QUIP_CONFIG env > ~/.quip/quip.toml
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Ok(p) = std::env::var("QUIP_CONFIG") {
        return PathBuf::from(p);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".quip")
        .join("quip.toml")
}

/// Load and validate the config. A missing or malformed file is fatal at
/// startup — the bot refuses to run on a guessed configuration.
pub fn load(path: Option<&Path>) -> Result<QuipConfig> {
    let config_path = resolve_path(path);
    info!(?config_path, "loading configuration");
    let config = reload(&config_path)?;
    config.validate()?;
    Ok(config)
}

/// Re-read the config from disk without validation side effects. Used both
/// by [`load`] and by the SIGHUP handler, which keeps the running config
/// when this fails.
pub fn reload(config_path: &Path) -> Result<QuipConfig> {
    let raw = std::fs::read_to_string(config_path).map_err(|e| {
        QuipError::Config(format!("failed to read {}: {}", config_path.display(), e))
    })?;
    toml::from_str::<QuipConfig>(&raw).map_err(|e| {
        QuipError::Config(format!("failed to parse {}: {}", config_path.display(), e))
    })
}
