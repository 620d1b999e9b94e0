//! CLI command implementations

pub mod init;
pub mod preview;
pub mod sync;
pub mod validate;

use anyhow::{Context, Result};
use crmsync_core::{Config, ConfigOverrides};

/// Load the configuration at `config_path` and apply `overrides`
pub(crate) fn load_config(config_path: &str, overrides: ConfigOverrides) -> Result<Config> {
    tracing::info!("Loading configuration from {}", config_path);

    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    config
        .apply_overrides(overrides)
        .context("Failed to apply overrides")?;
    Ok(config)
}
