mod app;
mod commands;
mod config;
mod db;
mod event;
mod liked;
mod listings;
mod logging;
mod metrics;
mod preferences;
mod sync;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "haven")]
#[command(about = "Swipe through rental listings from your terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./haven.yaml, then $XDG_CONFIG_HOME/haven/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Name recorded with swipe metrics
  #[arg(short, long)]
  user: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = logging::init()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;

  // Override username if specified on command line
  let config = match args.user {
    Some(user) => config::Config {
      username: Some(user),
      ..config
    },
    None => config,
  };
  info!(backend = %config.backend.url, "Starting haven");

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
