//! Validate configuration command

use anyhow::{Context, Result};
use crmsync_core::ConfigOverrides;

use super::load_config;

/// Run the validate command
pub async fn run(config_path: &str, overrides: ConfigOverrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;

    config.sync.validate().context("Configuration is invalid")?;

    tracing::info!("✓ Endpoint: {}", config.sync.pipedrive.resolve_base_url()?);
    tracing::info!("✓ Mapping entries: {}", config.sync.mapping.len());

    let input = config.load_input().context("Failed to load input record")?;
    let plan = crmsync_core::plan(&config.sync.mapping, &input)
        .context("Input record cannot be synced")?;

    tracing::info!("✓ Identifying value: {}", plan.identity);
    tracing::info!("✓ Payload fields: {}", plan.payload.len());
    tracing::info!("✓ Configuration is valid");
    Ok(())
}
