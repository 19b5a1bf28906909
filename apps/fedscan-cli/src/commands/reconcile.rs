//! Reconcile command - Compare a member node's inventory with the coordinator

use crate::config::ConnectionArgs;
use crate::error::{CliError, CliResult};
use crate::output::{print_header, print_json};
use crate::progress::FetchProgress;
use crate::registry;
use clap::Args;
use fedscan_client::{NodeClient, NodeRecord};
use fedscan_recon::{FetchConfig, ReconError, ReconReport, ReconcileOptions, Reconciler};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Args)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Member node to reconcile, matched as a case-insensitive substring of
    /// its node id
    #[arg(value_name = "NODE", required_unless_present = "all", conflicts_with = "all")]
    pub node: Option<String>,

    /// Reconcile every member node in the registry
    #[arg(long)]
    pub all: bool,

    /// Records fetched per listing page
    #[arg(long, env = "FEDSCAN_PAGE_SIZE", default_value_t = 1000)]
    pub page_size: u64,

    /// Maximum identifiers listed per difference section (-1 for all)
    #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
    pub max_entries: i64,

    /// Abort a side's fetch after this many seconds
    #[arg(long, value_name = "SECS")]
    pub side_timeout: Option<u64>,

    /// Skip the advisory search-index count
    #[arg(long)]
    pub no_index: bool,

    /// Suppress progress bars
    #[arg(long, short)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ReconcileArgs {
    fn options(&self) -> ReconcileOptions {
        ReconcileOptions {
            fetch: FetchConfig::default().with_page_size(self.page_size),
            side_timeout: self.side_timeout.map(Duration::from_secs),
            max_entries: self.max_entries,
            check_index: !self.no_index,
        }
    }
}

/// Per-node outcome when running with `--all`.
#[derive(Serialize)]
struct NodeOutcome {
    node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ReconReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn execute(args: ReconcileArgs) -> CliResult<()> {
    let coordinator = args.connection.coordinator()?;
    let nodes = registry::fetch(&coordinator).await?;
    let coordinator_id = registry::coordinator_id(&nodes, &args.connection.coord_url);

    // One token for the whole invocation; Ctrl-C aborts every remaining run.
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    if args.all {
        return reconcile_all(&args, &coordinator, &coordinator_id, &nodes, &cancel).await;
    }

    let pattern = args.node.as_deref().unwrap_or_default();
    let member = registry::find_member(&nodes, pattern)?;
    let report = match reconcile_one(&args, &coordinator, &coordinator_id, member, &cancel).await {
        Err(CliError::Recon(ReconError::Cancelled)) => return Err(CliError::Interrupted),
        other => other?,
    };

    if args.json {
        print_json(&report)?;
    } else {
        println!("{report}");
    }

    if report.has_discrepancies() {
        return Err(CliError::Discrepancies(
            "inventory differences found".into(),
        ));
    }
    Ok(())
}

async fn reconcile_one(
    args: &ReconcileArgs,
    coordinator: &NodeClient,
    coordinator_id: &str,
    node: &NodeRecord,
    cancel: &CancellationToken,
) -> CliResult<ReconReport> {
    let member = NodeClient::new(&node.base_url, &args.connection.client_config()?)?;
    // Child token per run: a side timeout cancels only this run, while the
    // parent still aborts all of them.
    let reconciler = Reconciler::new(
        coordinator.clone(),
        member,
        coordinator_id,
        &node.node_id,
        args.options(),
    )
    .with_cancellation(cancel.child_token());

    let report = if args.quiet || args.json {
        reconciler.run().await?
    } else {
        let bars = FetchProgress::new(coordinator_id, &node.node_id);
        let report = reconciler.with_progress(bars.hook()).run().await;
        bars.finish();
        report?
    };
    Ok(report)
}

async fn reconcile_all(
    args: &ReconcileArgs,
    coordinator: &NodeClient,
    coordinator_id: &str,
    nodes: &[NodeRecord],
    cancel: &CancellationToken,
) -> CliResult<()> {
    let mut outcomes = Vec::new();
    for node in registry::members(nodes) {
        match reconcile_one(args, coordinator, coordinator_id, node, cancel).await {
            Ok(report) => outcomes.push(NodeOutcome {
                node_id: node.node_id.clone(),
                report: Some(report),
                error: None,
            }),
            // Operator cancellation stops the whole sweep, not just one node.
            Err(CliError::Recon(ReconError::Cancelled)) => return Err(CliError::Interrupted),
            // One unreachable node must not stop the sweep.
            Err(error) => {
                warn!(node = %node.node_id, error = %error, "Reconciliation failed");
                outcomes.push(NodeOutcome {
                    node_id: node.node_id.clone(),
                    report: None,
                    error: Some(error.to_string()),
                });
            }
        }
    }

    if args.json {
        print_json(&outcomes)?;
    } else {
        for outcome in &outcomes {
            print_header(&outcome.node_id);
            match (&outcome.report, &outcome.error) {
                (Some(report), _) => println!("{report}\n"),
                (None, Some(error)) => println!("FAILED: {error}\n"),
                (None, None) => unreachable!(),
            }
        }
    }

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    let differing = outcomes
        .iter()
        .filter(|o| o.report.as_ref().is_some_and(ReconReport::has_discrepancies))
        .count();

    if failed > 0 {
        return Err(CliError::SweepFailed(format!(
            "{failed} of {} nodes could not be reconciled",
            outcomes.len()
        )));
    }
    if differing > 0 {
        return Err(CliError::Discrepancies(format!(
            "{differing} of {} nodes have inventory differences",
            outcomes.len()
        )));
    }
    Ok(())
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            token.cancel();
        }
    });
}
