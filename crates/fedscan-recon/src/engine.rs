//! Two-sided inventory comparison.
//!
//! Fetches the left (coordinator, filtered to the member) and right (member)
//! inventories concurrently, each under its own timeout, and computes the
//! exact asymmetric differences. A side that fails irrecoverably aborts the
//! whole comparison; a partial diff would understate discrepancies in a
//! misleading way and is never produced.

use crate::error::{ReconError, ReconResult, Side};
use crate::fetch::{fetch_all, FetchConfig, Progress};
use crate::index::InventoryIndex;
use crate::report::ReconReport;
use fedscan_client::{NodeClient, RetryPolicy};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exact asymmetric difference of two inventories. Derived, recomputed fresh
/// per comparison, never mutated in place.
#[derive(Debug, Clone)]
pub struct DiffResult {
    /// Identifiers present in `left`, absent from `right` (sorted).
    pub only_in_left: Vec<String>,
    /// Identifiers present in `right`, absent from `left` (sorted).
    pub only_in_right: Vec<String>,
    pub left_total: u64,
    pub right_total: u64,
}

/// Compute pure set differences between two inventories; no approximation.
#[must_use]
pub fn diff(left: &InventoryIndex, right: &InventoryIndex) -> DiffResult {
    let left_ids: HashSet<&str> = left.identifiers().collect();
    let right_ids: HashSet<&str> = right.identifiers().collect();

    let mut only_in_left: Vec<String> = left_ids
        .difference(&right_ids)
        .map(ToString::to_string)
        .collect();
    let mut only_in_right: Vec<String> = right_ids
        .difference(&left_ids)
        .map(ToString::to_string)
        .collect();
    // Lexicographic here for determinism; the report re-orders by timestamp.
    only_in_left.sort_unstable();
    only_in_right.sort_unstable();

    DiffResult {
        only_in_left,
        only_in_right,
        left_total: left.len() as u64,
        right_total: right.len() as u64,
    }
}

/// Callback invoked with fetch progress per side.
pub type ProgressHook = Arc<dyn Fn(Side, Progress) + Send + Sync>;

/// Options for a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub fetch: FetchConfig,
    /// Overall budget per side. The fetcher retries forever; this is the
    /// documented bound on that loop.
    pub side_timeout: Option<Duration>,
    /// Report truncation limit; -1 means unlimited.
    pub max_entries: i64,
    /// Whether to query the secondary search index for an advisory count.
    pub check_index: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            side_timeout: None,
            max_entries: 10,
            check_index: true,
        }
    }
}

/// One reconciliation run between a coordinating node and a member node.
///
/// Owns fresh state per run; nothing is cached across invocations.
pub struct Reconciler {
    coordinator: NodeClient,
    member: NodeClient,
    coordinator_id: String,
    member_id: String,
    options: ReconcileOptions,
    cancel: CancellationToken,
    progress: Option<ProgressHook>,
}

impl Reconciler {
    pub fn new(
        coordinator: NodeClient,
        member: NodeClient,
        coordinator_id: impl Into<String>,
        member_id: impl Into<String>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            coordinator,
            member,
            coordinator_id: coordinator_id.into(),
            member_id: member_id.into(),
            options,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Token cancelling the run; propagates into in-flight page fetches.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tie the run to an externally owned token, so one token can abort a
    /// whole sequence of runs. The run cancels its token itself when a side
    /// times out, so callers sharing a token across runs must pass a child
    /// token per run.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Install a per-side progress callback.
    #[must_use]
    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    /// Fetch both inventories, diff them, and build the report.
    pub async fn run(&self) -> ReconResult<ReconReport> {
        info!(
            coordinator = %self.coordinator_id,
            member = %self.member_id,
            "Starting inventory reconciliation"
        );

        // The coordinator's listing is scoped to the member under comparison;
        // the member lists its own full inventory. Different hosts, so the
        // two fetches proceed concurrently.
        let left = self.fetch_side(
            Side::Left,
            &self.coordinator,
            &self.coordinator_id,
            Some(self.member_id.clone()),
        );
        let right = self.fetch_side(Side::Right, &self.member, &self.member_id, None);
        let (left_index, right_index) = tokio::try_join!(left, right)?;

        let diff = diff(&left_index, &right_index);
        info!(
            left_total = diff.left_total,
            right_total = diff.right_total,
            only_in_left = diff.only_in_left.len(),
            only_in_right = diff.only_in_right.len(),
            "Inventories compared"
        );

        let index_count = if self.options.check_index {
            self.advisory_index_count().await
        } else {
            None
        };

        Ok(ReconReport::build(
            &diff,
            &left_index,
            &right_index,
            self.options.max_entries,
            index_count,
        ))
    }

    async fn fetch_side(
        &self,
        side: Side,
        client: &NodeClient,
        node_id: &str,
        node_filter: Option<String>,
    ) -> ReconResult<InventoryIndex> {
        let (stream, progress_rx) = fetch_all(
            client.clone(),
            node_filter,
            self.options.fetch.clone(),
            self.cancel.child_token(),
        );

        if let Some(hook) = &self.progress {
            let hook = hook.clone();
            let mut rx = progress_rx.clone();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    hook(side, *rx.borrow());
                }
            });
        }

        let build = InventoryIndex::build(node_id, stream);
        match self.options.side_timeout {
            Some(limit) => match tokio::time::timeout(limit, build).await {
                Ok(result) => result,
                Err(_) => {
                    // Cut the retry loop loose before reporting.
                    self.cancel.cancel();
                    let fetched = progress_rx.borrow().fetched;
                    Err(ReconError::side_failed(
                        side,
                        node_id,
                        fetched,
                        format!("timed out after {}s", limit.as_secs()),
                    ))
                }
            },
            None => build.await,
        }
    }

    /// Search-index record count for the member node. An independent source
    /// of truth: a mismatch against the member total signals index lag and is
    /// reported as an advisory, never folded into the diff.
    async fn advisory_index_count(&self) -> Option<u64> {
        let policy = RetryPolicy::default();
        let member_id = self.member_id.clone();
        let result = policy
            .execute("index_count", || {
                self.coordinator.index_count(&member_id)
            })
            .await;
        match result {
            Ok(count) => Some(count),
            Err(error) => {
                warn!(member = %self.member_id, error = %error, "Search-index count unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fedscan_client::{Checksum, ChecksumAlgorithm, ObjectRecord};

    fn record(pid: &str, day: u32) -> ObjectRecord {
        ObjectRecord {
            identifier: pid.to_string(),
            modified_at: Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap(),
            checksum: Checksum::new(ChecksumAlgorithm::Sha256, "aa"),
            size: None,
        }
    }

    fn index(node: &str, records: Vec<ObjectRecord>) -> InventoryIndex {
        InventoryIndex::from_records(node, records).unwrap()
    }

    #[test]
    fn diff_matches_expected_scenario() {
        // Left = {a@t1, b@t2}, Right = {b@t2, c@t3}.
        let left = index("cn", vec![record("a", 1), record("b", 2)]);
        let right = index("mn", vec![record("b", 2), record("c", 3)]);

        let result = diff(&left, &right);
        assert_eq!(result.only_in_left, vec!["a"]);
        assert_eq!(result.only_in_right, vec!["c"]);
        assert_eq!(result.left_total, 2);
        assert_eq!(result.right_total, 2);
    }

    #[test]
    fn diff_with_itself_is_empty() {
        let a = index("cn", vec![record("a", 1), record("b", 2), record("c", 3)]);
        let b = index("mn", vec![record("a", 1), record("b", 2), record("c", 3)]);
        let result = diff(&a, &b);
        assert!(result.only_in_left.is_empty());
        assert!(result.only_in_right.is_empty());
    }

    #[test]
    fn diff_is_symmetric() {
        let a = index("cn", vec![record("a", 1), record("b", 2)]);
        let b = index("mn", vec![record("b", 2), record("c", 3)]);

        let ab = diff(&a, &b);
        let ba = diff(&b, &a);
        assert_eq!(ab.only_in_left, ba.only_in_right);
        assert_eq!(ab.only_in_right, ba.only_in_left);
    }

    #[test]
    fn diff_against_empty_side() {
        let a = index("cn", vec![record("a", 1), record("b", 2)]);
        let b = index("mn", vec![]);
        let result = diff(&a, &b);
        assert_eq!(result.only_in_left.len(), 2);
        assert!(result.only_in_right.is_empty());
        assert_eq!(result.right_total, 0);
    }
}
