mod summary;
mod update;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Track Express Entry invitation rounds.
#[derive(Parser)]
#[command(name = "crswatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the rounds feed, validate it, and adopt it if it has a newer draw.
    Update(update::UpdateArgs),
    /// Print the dashboard views for the persisted rounds.
    Summary(summary::SummaryArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("crswatch v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Update(args) => update::run(args).await,
        Command::Summary(args) => summary::run(&args),
    }
}
