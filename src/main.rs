//! av-converter CLI
//!
//! Converts legacy camera videos into the media library. The hardware path
//! runs first; formats it cannot read fall back to a downloadable software
//! converter that stays in use for the rest of the batch.
//!
//! # Usage
//!
//! ```bash
//! av-converter convert DCIM/ --yes
//! av-converter profile --preset standard-720p --json
//! av-converter component status
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use av_converter::app::DefaultAppContainer;
use av_converter::cli::{commands, Cli, Commands};
use av_converter::config_initialization::{initialize_configuration_hierarchy, ConfigOverrides};
use av_converter::utils::logging::init_logging;

/// Main entry point for the av-converter CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (preset, hw_encoder) = match &cli.command {
        Commands::Convert(args) => (args.preset.clone(), args.hw_encoder),
        Commands::Profile(args) => (args.preset.clone(), None),
        Commands::Component(_) => (None, None),
    };
    let overrides = ConfigOverrides {
        config_path: cli.config.clone(),
        log_level: cli.log_level,
        preset,
        hw_encoder,
    };

    let config = initialize_configuration_hierarchy(&overrides)
        .context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;
    info!("Starting av-converter");

    let container = DefaultAppContainer::new(config).context("Invalid conversion profile")?;

    let result = match cli.command {
        Commands::Convert(args) => commands::convert(&container, args, cli.json).await,
        Commands::Profile(args) => commands::profile(&container, args, cli.json),
        Commands::Component(args) => commands::component(&container, args, cli.json).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
