//! Sync the input record into Pipedrive

use anyhow::{Context, Result};
use crmsync_core::{ConfigOverrides, PipedriveClient, Synchronizer};

use super::load_config;

/// Run the sync command
pub async fn run(config_path: &str, overrides: ConfigOverrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;

    config.sync.validate().context("Configuration is invalid")?;

    let input = config.load_input().context("Failed to load input record")?;
    let client = PipedriveClient::new(&config.sync.pipedrive)?;

    tracing::info!("Syncing to {}", client.base_url());

    let outcome = Synchronizer::new(&config.sync.mapping, &client)
        .sync(&input)
        .await
        .context("Sync failed")?;

    tracing::info!(
        "✓ {} person {} (run {})",
        outcome.action,
        outcome.person.id,
        outcome.run_id
    );
    println!("{}", serde_json::to_string_pretty(&outcome.person)?);
    Ok(())
}
