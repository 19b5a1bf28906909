//! Discrepancy report.
//!
//! Orders each "only on X" list ascending by modification time: operators
//! investigating a discrepancy usually care first about the oldest stale
//! entries, which are most likely stuck rather than in-flight. Truncation
//! always states the true count first, so it never hides the scale of a
//! discrepancy.

use crate::engine::DiffResult;
use crate::index::InventoryIndex;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// One listed discrepancy.
#[derive(Debug, Clone, Serialize)]
pub struct DiffEntry {
    pub identifier: String,
    pub modified_at: DateTime<Utc>,
}

/// The identifiers one node holds that the other does not.
#[derive(Debug, Clone, Serialize)]
pub struct DiffSection {
    /// Node whose inventory these entries came from.
    pub node_id: String,
    /// Node they are missing from.
    pub other_node_id: String,
    /// This node's full inventory size.
    pub node_total: u64,
    /// True number of missing identifiers, stated even when truncated.
    pub missing_total: u64,
    /// Oldest-first listing, truncated to the configured maximum.
    pub entries: Vec<DiffEntry>,
    pub truncated: bool,
}

impl DiffSection {
    fn build(
        node: &InventoryIndex,
        other_node_id: &str,
        only_here: &[String],
        node_total: u64,
        max_entries: i64,
    ) -> Self {
        let mut entries: Vec<DiffEntry> = only_here
            .iter()
            .filter_map(|pid| node.get(pid))
            .map(|record| DiffEntry {
                identifier: record.identifier.clone(),
                modified_at: record.modified_at,
            })
            .collect();
        // Oldest first; identifier breaks ties so output is reproducible.
        entries.sort_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });

        let missing_total = entries.len() as u64;
        let truncated = max_entries >= 0 && missing_total > max_entries as u64;
        if truncated {
            entries.truncate(max_entries as usize);
        }

        Self {
            node_id: node.node_id().to_string(),
            other_node_id: other_node_id.to_string(),
            node_total,
            missing_total,
            entries,
            truncated,
        }
    }
}

impl fmt::Display for DiffSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // An empty node is reported as such, never as "all objects differ".
        if self.node_total == 0 {
            return writeln!(f, "{}: Has NO objects", self.node_id);
        }
        if self.missing_total == 0 {
            return writeln!(
                f,
                "{}: Has {} objects, all of which are on {}",
                self.node_id, self.node_total, self.other_node_id
            );
        }
        writeln!(
            f,
            "{}: Has {} objects that are not on {}",
            self.node_id, self.missing_total, self.other_node_id
        )?;
        if self.truncated {
            writeln!(
                f,
                "{}: First {} objects:",
                self.node_id,
                self.entries.len()
            )?;
        } else {
            writeln!(
                f,
                "{}: All {} objects:",
                self.node_id, self.missing_total
            )?;
        }
        for entry in &self.entries {
            writeln!(
                f,
                "{}:   pid=\"{}\" modified=\"{}\"",
                self.node_id,
                entry.identifier,
                entry.modified_at.to_rfc3339()
            )?;
        }
        Ok(())
    }
}

/// Structured reconciliation report, renderable as text ([`fmt::Display`])
/// or machine-readable JSON (serde).
#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub left_node: String,
    pub right_node: String,
    pub left_total: u64,
    pub right_total: u64,
    pub identical: bool,
    pub only_in_left: DiffSection,
    pub only_in_right: DiffSection,
    /// Advisory search-index record count for the right node, if queried.
    /// Independent of the diff; a mismatch with `right_total` signals index
    /// lag, not an inventory discrepancy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_count: Option<u64>,
}

impl ReconReport {
    /// Assemble the report from a computed diff and the two indexes.
    ///
    /// `max_entries` bounds each listing; -1 means unlimited. The true
    /// missing counts are always preserved.
    #[must_use]
    pub fn build(
        diff: &DiffResult,
        left: &InventoryIndex,
        right: &InventoryIndex,
        max_entries: i64,
        index_count: Option<u64>,
    ) -> Self {
        let identical = diff.only_in_left.is_empty()
            && diff.only_in_right.is_empty()
            && diff.left_total == diff.right_total;
        Self {
            left_node: left.node_id().to_string(),
            right_node: right.node_id().to_string(),
            left_total: diff.left_total,
            right_total: diff.right_total,
            identical,
            only_in_left: DiffSection::build(
                left,
                right.node_id(),
                &diff.only_in_left,
                diff.left_total,
                max_entries,
            ),
            only_in_right: DiffSection::build(
                right,
                left.node_id(),
                &diff.only_in_right,
                diff.right_total,
                max_entries,
            ),
            index_count,
        }
    }

    /// Whether any discrepancy was found.
    #[must_use]
    pub fn has_discrepancies(&self) -> bool {
        self.only_in_left.missing_total > 0 || self.only_in_right.missing_total > 0
    }
}

impl fmt::Display for ReconReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: Total number of objects: {} (for {})",
            self.left_node, self.left_total, self.right_node
        )?;
        writeln!(
            f,
            "{}: Total number of objects: {}",
            self.right_node, self.right_total
        )?;
        writeln!(f)?;
        if self.identical {
            writeln!(
                f,
                "Inventories are identical: {} objects on both nodes",
                self.left_total
            )?;
        } else {
            self.only_in_left.fmt(f)?;
            writeln!(f)?;
            self.only_in_right.fmt(f)?;
        }
        if let Some(count) = self.index_count {
            writeln!(f)?;
            writeln!(
                f,
                "{}: Search index records for {}: {}",
                self.left_node, self.right_node, count
            )?;
        }
        Ok(())
    }
}
