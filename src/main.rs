//! media-shelf CLI
//!
//! Front end over the catalog: browse folders, manage libraries,
//! containers and items.

mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use media_shelf::config::AppConfig;

#[derive(Parser)]
#[command(name = "media-shelf")]
#[command(about = "Browse media folders and manage a media library catalog")]
struct Cli {
    /// Catalog database file (defaults to the user data directory)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Thumbnail edge length in pixels
    #[arg(long, global = true)]
    thumbnail_size: Option<u32>,

    /// Log filter, e.g. `media_shelf=debug` (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: commands::Commands,
}

impl Cli {
    fn config(&self) -> Result<AppConfig> {
        let mut config = match &self.database {
            Some(path) => AppConfig::with_database_path(path),
            None => AppConfig::from_user_dirs()?,
        };
        if let Some(size) = self.thumbnail_size {
            config = config.thumbnail_size(size)?;
        }
        if let Some(filter) = &self.log {
            config = config.log_filter(filter.as_str());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let output = commands::Output { json: cli.json };
    commands::handle_command(cli.command, &config, &output)
}
