mod cache;
mod cli;
mod collab;
mod config;
mod error;
mod events;
mod response;
mod status;
mod translator;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cli::commands::init::run(force).await?;
        }
        Commands::Run {
            source,
            output,
            source_lang,
            target_lang,
            resume,
        } => {
            cli::commands::run::run(source, output, source_lang, target_lang, resume).await?;
        }
        Commands::Stop => {
            cli::commands::stop::run().await?;
        }
        Commands::Export { output } => {
            cli::commands::export::run(output).await?;
        }
        Commands::Status { output } => {
            cli::commands::status::run(output).await?;
        }
    }

    Ok(())
}
