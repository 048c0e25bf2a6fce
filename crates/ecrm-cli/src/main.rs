//! ecrm - removes expired container images that nothing uses.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod prompt;
mod report;
mod runner;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the report, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ecrm={}", cli.global.log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.global.no_color),
        )
        .init();

    match cli.command {
        Commands::Scan(args) => commands::scan::run(&cli.global, &args).await,
        Commands::Delete(args) => commands::delete::run(&cli.global, &args).await,
        Commands::Version => {
            println!("ecrm {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
