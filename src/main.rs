//! tunedrop - Queue media URLs and download them as tagged audio files

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod cover;
mod download;
mod store;
mod tags;
mod utils;
mod ytdlp;

use cli::{Cli, Commands, QueueCommands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "tunedrop=debug"
    } else {
        "tunedrop=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Queue { command } => {
            let config = Config::load(cli.data_root)?;
            match command {
                QueueCommands::Add { user, urls } => {
                    cli::commands::queue_add(&config, &user, urls).await?;
                }
                QueueCommands::List { user } => {
                    cli::commands::queue_list(&config, &user).await?;
                }
                QueueCommands::Clear { user } => {
                    cli::commands::queue_clear(&config, &user).await?;
                }
            }
        }
        Commands::Run { user, workers } => {
            let config = Config::load(cli.data_root)?;
            cli::commands::run(config, &user, workers).await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
