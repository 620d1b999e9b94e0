//! crmsync CLI
//!
//! Syncs a single person record from a local JSON file into Pipedrive.

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use crmsync_core::ConfigOverrides;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// crmsync - push person records into Pipedrive
#[derive(Parser)]
#[command(name = "crmsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file or project directory
    #[arg(short, long, default_value = "crmsync.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "CRMSYNC_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Commands,
}

/// How log lines are written to stderr
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Settings that take precedence over the configuration file
#[derive(Args)]
struct OverrideArgs {
    /// Pipedrive API token
    #[arg(long, env = "PIPEDRIVE_API_TOKEN", hide_env_values = true, global = true)]
    api_token: Option<String>,

    /// Pipedrive company subdomain (e.g. `acme` for acme.pipedrive.com)
    #[arg(long, env = "PIPEDRIVE_COMPANY_DOMAIN", global = true)]
    company_domain: Option<String>,

    /// Full API base URL, overrides the company domain
    #[arg(long, env = "PIPEDRIVE_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Input record file
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            api_token: args.api_token,
            company_domain: args.company_domain,
            base_url: args.base_url,
            input: args.input,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new crmsync project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Validate configuration and input without contacting Pipedrive
    Validate,

    /// Print the payload that would be sent
    Preview,

    /// Look up the person and create or update it
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let fmt_layer = match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    let overrides = ConfigOverrides::from(cli.overrides);

    match cli.command {
        Commands::Init { path } => {
            commands::init::run(&path).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config, overrides).await?;
        }
        Commands::Preview => {
            commands::preview::run(&cli.config, overrides).await?;
        }
        Commands::Sync => {
            commands::sync::run(&cli.config, overrides).await?;
        }
    }

    Ok(())
}
