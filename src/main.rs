//! Recap CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recap::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => recap::cli::commands::init::execute(args, cli.json).await,
        Commands::Scan(args) => recap::cli::commands::scan::execute(args, cli.json).await,
        Commands::Backfill(args) => recap::cli::commands::backfill::execute(args, cli.json).await,
        Commands::Sync(args) => recap::cli::commands::sync::execute(args, cli.json).await,
        Commands::Integrity(args) => recap::cli::commands::integrity::execute(args, cli.json).await,
        Commands::Cleanup(args) => recap::cli::commands::cleanup::execute(args, cli.json).await,
        Commands::Status(args) => recap::cli::commands::status::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        recap::cli::handle_error(err, cli.json);
    }
}
