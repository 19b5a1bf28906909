//! fedscan CLI - Inventory reconciliation and replica audit
//!
//! This CLI enables federation operators to:
//! - Compare a member node's object inventory with the coordinator's view
//! - Verify that every replica of an object is byte-consistent
//! - List the node registry and per-node object counts

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;
mod output;
mod progress;
mod registry;

use error::CliResult;

/// fedscan - federated storage network consistency checks
#[derive(Parser)]
#[command(name = "fedscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a member node's inventory with the coordinator's view of it
    Reconcile(commands::reconcile::ReconcileArgs),

    /// Verify replica checksums for one or more objects
    Audit(commands::audit::AuditArgs),

    /// List the federation's node registry
    Nodes(commands::nodes::NodesArgs),

    /// Show per-node object counts
    Counts(commands::counts::CountsArgs),
}

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr so stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Reconcile(args) => commands::reconcile::execute(args).await,
        Commands::Audit(args) => commands::audit::execute(args).await,
        Commands::Nodes(args) => commands::nodes::execute(args).await,
        Commands::Counts(args) => commands::counts::execute(args).await,
    }
}
