//! Counts command - Per-node object counts
//!
//! For each member node, shows the coordinator's count of records held by
//! that node next to the node's own count. A node that cannot be reached
//! gets its error inline; the other nodes still report.

use crate::config::ConnectionArgs;
use crate::error::CliResult;
use crate::output::{print_json, truncate};
use crate::registry;
use clap::Args;
use fedscan_client::NodeClient;
use serde::Serialize;

#[derive(Args)]
pub struct CountsArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct NodeCounts {
    node_id: String,
    coordinator_view: Result<u64, String>,
    node_view: Result<u64, String>,
}

pub async fn execute(args: CountsArgs) -> CliResult<()> {
    let client_config = args.connection.client_config()?;
    let coordinator = args.connection.coordinator()?;
    let nodes = registry::fetch(&coordinator).await?;

    let mut rows = Vec::new();
    for node in registry::members(&nodes) {
        let coordinator_view = coordinator
            .count_objects(Some(&node.node_id))
            .await
            .map_err(|e| e.to_string());

        let node_view = match NodeClient::new(&node.base_url, &client_config) {
            Ok(client) => client.count_objects(None).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        rows.push(NodeCounts {
            node_id: node.node_id.clone(),
            coordinator_view,
            node_view,
        });
    }

    if args.json {
        return print_json(&rows);
    }

    let width = rows
        .iter()
        .map(|r| r.node_id.len())
        .max()
        .unwrap_or(0)
        .max("NODE".len());
    println!("{:<width$}  {:>12}  {:>12}", "NODE", "CN VIEW", "NODE VIEW");
    for row in &rows {
        println!(
            "{:<width$}  {:>12}  {:>12}",
            row.node_id,
            cell(&row.coordinator_view),
            cell(&row.node_view)
        );
    }
    Ok(())
}

fn cell(count: &Result<u64, String>) -> String {
    match count {
        Ok(n) => n.to_string(),
        Err(e) => truncate(e, 50),
    }
}
