//! testshift CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use testshift::cli::{Cli, Commands};
use testshift::infrastructure::logging::{LogConfig, LoggerImpl};
use testshift::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli.command, cli.config.as_deref(), cli.json).await {
        testshift::cli::handle_error(err, cli.json);
    }
}

async fn run(command: Commands, config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    let log_config = LogConfig::try_from(&config.logging)?;
    let _logger = LoggerImpl::init(&log_config).context("Failed to initialize logging")?;

    match command {
        Commands::Migrate(args) => testshift::cli::commands::migrate::execute(args, config, json).await,
        Commands::Status(args) => testshift::cli::commands::status::execute(args, &config, json).await,
        Commands::Clean(args) => testshift::cli::commands::clean::execute(args, &config, json).await,
    }
}
