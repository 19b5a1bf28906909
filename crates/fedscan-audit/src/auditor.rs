//! Per-identifier replica audit.
//!
//! State machine per identifier: fetch the authoritative metadata record,
//! then for each replica node fetch the node's declared checksum and
//! recompute one from the streamed bytes, then compare. Replica nodes are
//! visited independently; a failure on one must not abort the others.

use crate::digest::digest_stream;
use crate::error::{AuditError, AuditResult};
use fedscan_client::{
    Checksum, ChecksumAlgorithm, ClientConfig, ClientError, NodeClient, ReplicaStatus,
    RetryPolicy,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Hard ceiling on replica-audit concurrency, to avoid overwhelming remote
/// nodes regardless of configuration.
pub const MAX_CONCURRENCY: usize = 10;

/// Auditor configuration.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Replica nodes checked concurrently (clamped to [1, MAX_CONCURRENCY]).
    pub concurrency: usize,
    /// Bounded retry for the authoritative metadata and registry fetches.
    pub metadata_retry: RetryPolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            metadata_retry: RetryPolicy::default(),
        }
    }
}

/// The audit result for one node holding a replica. Discarded after the
/// report is emitted; nothing is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ReplicaRecord {
    pub node_id: String,
    /// The node's own declared checksum, if it could be retrieved.
    pub declared: Option<Checksum>,
    /// Checksum recomputed from the node's streamed content, if retrievable.
    pub recomputed: Option<Checksum>,
    /// Error captured while checking this replica, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True iff the recomputed checksum equals the node's declared one.
    pub consistent: bool,
}

impl ReplicaRecord {
    fn failed(node_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            declared: None,
            recomputed: None,
            error: Some(error.into()),
            consistent: false,
        }
    }
}

impl fmt::Display for ReplicaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declared = self
            .declared
            .as_ref()
            .map_or_else(|| "<unavailable>".to_string(), ToString::to_string);
        let recomputed = self
            .recomputed
            .as_ref()
            .map_or_else(|| "<unavailable>".to_string(), ToString::to_string);
        write!(
            f,
            "{}: declared={} recomputed={} consistent={}",
            self.node_id, declared, recomputed, self.consistent
        )?;
        if let Some(error) = &self.error {
            write!(f, " error=\"{error}\"")?;
        }
        Ok(())
    }
}

/// Overall verdict across all replicas of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditVerdict {
    Consistent,
    Inconsistent,
}

impl fmt::Display for AuditVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Consistent => f.write_str("consistent"),
            Self::Inconsistent => f.write_str("INCONSISTENT"),
        }
    }
}

/// Complete audit output for one identifier.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    pub identifier: String,
    /// Algorithm from the authoritative record; fixed for the whole audit so
    /// declared and recomputed digests are comparable.
    pub algorithm: ChecksumAlgorithm,
    /// The authoritative declared checksum.
    pub declared: Checksum,
    /// One record per replica node, sorted by node id.
    pub replicas: Vec<ReplicaRecord>,
    pub verdict: AuditVerdict,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PID: {}", self.identifier)?;
        writeln!(f, "Authoritative checksum: {}", self.declared)?;
        for replica in &self.replicas {
            writeln!(f, "  {replica}")?;
        }
        write!(f, "Verdict: {}", self.verdict)
    }
}

/// Audits one identifier at a time against every node claiming a replica.
pub struct ReplicaAuditor {
    coordinator: NodeClient,
    client_config: ClientConfig,
    config: AuditConfig,
    cancel: CancellationToken,
}

impl ReplicaAuditor {
    pub fn new(coordinator: NodeClient, client_config: ClientConfig, config: AuditConfig) -> Self {
        Self {
            coordinator,
            client_config,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelling the audit; in-flight content streams abort with it.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Audit one object across all its replica nodes.
    ///
    /// Fails only on the authoritative step (unknown identifier, unreachable
    /// coordinator). Per-replica failures are captured in the records.
    pub async fn audit(&self, pid: &str) -> AuditResult<AuditOutcome> {
        info!(pid, "Starting replica audit");

        let meta = self
            .config
            .metadata_retry
            .execute("system_metadata", || {
                self.coordinator.get_system_metadata(pid)
            })
            .await
            .map_err(|error| match error {
                ClientError::NotFound { .. } => AuditError::UnknownIdentifier(pid.to_string()),
                other => AuditError::MetadataUnavailable {
                    pid: pid.to_string(),
                    source: other,
                },
            })?;

        let algorithm = meta.checksum.algorithm;
        let replicas: Vec<_> = meta
            .replicas
            .iter()
            .filter(|r| r.status == ReplicaStatus::Completed)
            .collect();
        if replicas.is_empty() {
            return Err(AuditError::NoReplicas(pid.to_string()));
        }

        // Resolve replica node addresses once, up front.
        let registry: HashMap<String, String> = self
            .config
            .metadata_retry
            .execute("node_registry", || self.coordinator.list_nodes())
            .await
            .map_err(AuditError::RegistryUnavailable)?
            .into_iter()
            .map(|node| (node.node_id, node.base_url))
            .collect();

        debug!(
            pid,
            algorithm = %algorithm,
            replicas = replicas.len(),
            "Fanning out replica checks"
        );

        let concurrency = self.config.concurrency.clamp(1, MAX_CONCURRENCY);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();

        for replica in replicas {
            let node_id = replica.node_id.clone();
            let base_url = registry.get(&node_id).cloned();
            let client_config = self.client_config.clone();
            let pid = pid.to_string();
            let cancel = self.cancel.child_token();
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return ReplicaRecord::failed(&node_id, "worker pool closed");
                };
                tokio::select! {
                    () = cancel.cancelled() => ReplicaRecord::failed(&node_id, "audit cancelled"),
                    record = check_replica(&node_id, base_url, &client_config, &pid, algorithm) => record,
                }
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(record) => records.push(record),
                Err(error) => {
                    // A panicked worker must not take the audit down.
                    warn!(pid, error = %error, "Replica check task failed");
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Err(AuditError::Cancelled);
        }

        // Completion order is nondeterministic; report order must not be.
        records.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        let verdict = if records.iter().all(|r| r.consistent) {
            AuditVerdict::Consistent
        } else {
            AuditVerdict::Inconsistent
        };
        info!(pid, verdict = %verdict, replicas = records.len(), "Replica audit finished");

        Ok(AuditOutcome {
            identifier: pid.to_string(),
            algorithm,
            declared: meta.checksum,
            replicas: records,
            verdict,
        })
    }
}

/// Check one replica node. Errors are captured in the record, never raised.
async fn check_replica(
    node_id: &str,
    base_url: Option<String>,
    client_config: &ClientConfig,
    pid: &str,
    algorithm: ChecksumAlgorithm,
) -> ReplicaRecord {
    let Some(base_url) = base_url else {
        return ReplicaRecord::failed(node_id, "node not present in registry");
    };
    let client = match NodeClient::new(base_url, client_config) {
        Ok(client) => client,
        Err(error) => return ReplicaRecord::failed(node_id, error.to_string()),
    };

    let mut errors: Vec<String> = Vec::new();

    // The node's own declared checksum for this object.
    let declared = match client.get_system_metadata(pid).await {
        Ok(meta) => Some(meta.checksum),
        Err(error) => {
            errors.push(format!("declared checksum: {error}"));
            None
        }
    };

    // Declared and recomputed digests are only comparable under the same
    // algorithm, which was fixed by the authoritative record.
    if let Some(declared) = &declared {
        if declared.algorithm != algorithm {
            errors.push(format!(
                "checksum algorithm mismatch: node declares {}, audit uses {}",
                declared.algorithm, algorithm
            ));
        }
    }

    // Recompute from the actual bytes.
    let recomputed = match client.stream_object(pid).await {
        Ok(stream) => match digest_stream(algorithm, stream).await {
            Ok(checksum) => Some(checksum),
            Err(error) => {
                errors.push(format!("content stream: {error}"));
                None
            }
        },
        Err(error) => {
            errors.push(format!("content fetch: {error}"));
            None
        }
    };

    let consistent = match (&declared, &recomputed) {
        (Some(declared), Some(recomputed)) => errors.is_empty() && declared.matches(recomputed),
        _ => false,
    };

    ReplicaRecord {
        node_id: node_id.to_string(),
        declared,
        recomputed,
        error: if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        },
        consistent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_record_is_inconsistent() {
        let record = ReplicaRecord::failed("urn:node:MN1", "connection refused");
        assert!(!record.consistent);
        assert!(record.error.as_deref().unwrap().contains("refused"));
    }

    #[test]
    fn record_display_shows_both_checksums() {
        let record = ReplicaRecord {
            node_id: "urn:node:MN1".into(),
            declared: Some(Checksum::new(ChecksumAlgorithm::Sha256, "aa")),
            recomputed: Some(Checksum::new(ChecksumAlgorithm::Sha256, "bb")),
            error: None,
            consistent: false,
        };
        let text = record.to_string();
        assert!(text.contains("declared=SHA-256:aa"));
        assert!(text.contains("recomputed=SHA-256:bb"));
        assert!(text.contains("consistent=false"));
    }

    #[test]
    fn concurrency_is_clamped() {
        let config = AuditConfig {
            concurrency: 99,
            ..AuditConfig::default()
        };
        assert_eq!(config.concurrency.clamp(1, MAX_CONCURRENCY), 10);
        let config = AuditConfig {
            concurrency: 0,
            ..AuditConfig::default()
        };
        assert_eq!(config.concurrency.clamp(1, MAX_CONCURRENCY), 1);
    }
}
