//! Nodes command - List the federation's node registry

use crate::config::ConnectionArgs;
use crate::error::CliResult;
use crate::output::print_json;
use crate::registry;
use clap::Args;

#[derive(Args)]
pub struct NodesArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: NodesArgs) -> CliResult<()> {
    let coordinator = args.connection.coordinator()?;
    let nodes = registry::fetch(&coordinator).await?;

    if args.json {
        return print_json(&nodes);
    }

    let width = nodes
        .iter()
        .map(|n| n.node_id.len())
        .max()
        .unwrap_or(0)
        .max("NODE".len());
    println!("{:<width$}  {:<4}  BASE URL", "NODE", "KIND");
    for node in &nodes {
        println!(
            "{:<width$}  {:<4}  {}",
            node.node_id, node.kind, node.base_url
        );
    }
    Ok(())
}
