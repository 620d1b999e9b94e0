//! Show the payload a sync would send

use anyhow::{Context, Result};
use crmsync_core::ConfigOverrides;

use super::load_config;

/// Run the preview command
///
/// Credentials are not needed; nothing is sent.
pub async fn run(config_path: &str, overrides: ConfigOverrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;

    config
        .sync
        .validate_mapping()
        .context("Mapping is invalid")?;

    let input = config.load_input().context("Failed to load input record")?;
    let plan = crmsync_core::plan(&config.sync.mapping, &input)
        .context("Input record cannot be synced")?;

    tracing::info!("Person '{}' would be looked up by name", plan.identity);
    println!("{}", serde_json::to_string_pretty(&plan.payload)?);
    Ok(())
}
