mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use changer::state::Config;
use cli::commands::{auth, play, rack};
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = Config::load_or_default(&cli.dir)?;

    match cli.command {
        Command::Auth => auth::run(&config).await,
        Command::Logout => auth::logout(&config),
        Command::Search { query } => rack::search(&query, &config).await,
        Command::Load { slot, album } => rack::load(slot, &album, &config).await,
        Command::Remove { slot } => rack::remove(slot, &config).await,
        Command::Rack => rack::list(&config),
        Command::Volume { percent } => rack::volume(percent, &config).await,
        Command::Play { slot } => play::run(slot, &config).await,
    }
}
