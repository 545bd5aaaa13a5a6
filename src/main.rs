mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod state;
mod workflow;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::migrate::{self, MigrateArgs};
use crate::cmd::status::{self, StatusArgs};
use crate::error::AppResult;

#[derive(Parser)]
#[command(
    name = "trac2gh",
    author,
    version,
    about = "Migrate Trac tickets and comments to GitHub issues"
)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload tickets, then their comments; resumes from saved state if present.
    Migrate(MigrateArgs),
    /// Show how far a saved migration got.
    Status(StatusArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(error) = run(cli.command).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Commands) -> AppResult<()> {
    match command {
        Commands::Status(args) => status::run(args),
        Commands::Migrate(args) => {
            let report = migrate::run(args).await?;
            println!(
                "Migration complete: {} tickets, {} issues created, {} comments posted.",
                report.tickets, report.created, report.comments
            );
            Ok(())
        }
    }
}
