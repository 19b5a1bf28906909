//! Audit command - Verify replica checksums for one or more objects

use crate::config::ConnectionArgs;
use crate::error::{CliError, CliResult};
use crate::output::print_json;
use clap::Args;
use fedscan_audit::{AuditConfig, AuditError, AuditOutcome, AuditVerdict, ReplicaAuditor};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Args)]
pub struct AuditArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Object identifiers to audit, checked one after another
    #[arg(value_name = "PID", required = true)]
    pub pids: Vec<String>,

    /// Replica nodes checked concurrently per object
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Per-identifier outcome, errors included so one bad pid never hides the
/// results for the others.
#[derive(Serialize)]
struct PidOutcome {
    identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<AuditOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn execute(args: AuditArgs) -> CliResult<()> {
    let client_config = args.connection.client_config()?;
    let coordinator = args.connection.coordinator()?;
    let auditor = ReplicaAuditor::new(
        coordinator,
        client_config,
        AuditConfig {
            concurrency: args.concurrency,
            ..AuditConfig::default()
        },
    );

    cancel_on_ctrl_c(auditor.cancellation_token());

    let mut results = Vec::new();
    for pid in &args.pids {
        match auditor.audit(pid).await {
            Ok(outcome) => results.push(PidOutcome {
                identifier: pid.clone(),
                outcome: Some(outcome),
                error: None,
            }),
            Err(AuditError::Cancelled) => return Err(CliError::Interrupted),
            Err(error) => {
                warn!(pid = %pid, error = %error, "Audit failed");
                results.push(PidOutcome {
                    identifier: pid.clone(),
                    outcome: None,
                    error: Some(error.to_string()),
                });
            }
        }
    }

    if args.json {
        print_json(&results)?;
    } else {
        for result in &results {
            match (&result.outcome, &result.error) {
                (Some(outcome), _) => println!("{outcome}\n"),
                (None, Some(error)) => println!("PID: {}\nFAILED: {error}\n", result.identifier),
                (None, None) => unreachable!(),
            }
        }
    }

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    let inconsistent = results
        .iter()
        .filter(|r| {
            r.outcome
                .as_ref()
                .is_some_and(|o| o.verdict == AuditVerdict::Inconsistent)
        })
        .count();

    if failed > 0 {
        return Err(CliError::SweepFailed(format!(
            "{failed} of {} objects could not be audited",
            results.len()
        )));
    }
    if inconsistent > 0 {
        return Err(CliError::Discrepancies(format!(
            "{inconsistent} of {} objects have inconsistent replicas",
            results.len()
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
