//! Reconciliation error types.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for reconciliation operations.
pub type ReconResult<T> = Result<T, ReconError>;

/// Which inventory a two-sided failure belongs to. Ambiguous failures in a
/// two-sided comparison are much harder to debug than in a single-sided tool,
/// so every abort names its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// Errors that abort a reconciliation. Single-page fetch failures never
/// appear here; they are absorbed by the fetcher's retry loop.
#[derive(Debug, Error)]
pub enum ReconError {
    /// One node reported the same identifier twice in a single inventory
    /// pass. Silent overwrite would corrupt the diff without any visible
    /// symptom, so this aborts the comparison.
    #[error("Duplicate identifier in {node_id} inventory: \"{identifier}\"")]
    DuplicateIdentifier { node_id: String, identifier: String },

    /// One side's fetch failed irrecoverably. A partial diff is never
    /// reported; `fetched` records how far the side got before failing so a
    /// partial fetch is never confused with "no differences found".
    #[error("{side} inventory fetch ({node_id}) failed after {fetched} records: {message}")]
    SideFailed {
        side: Side,
        node_id: String,
        fetched: u64,
        message: String,
    },

    /// The operation was cancelled by the caller.
    #[error("Reconciliation cancelled")]
    Cancelled,
}

impl ReconError {
    pub fn duplicate(node_id: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::DuplicateIdentifier {
            node_id: node_id.into(),
            identifier: identifier.into(),
        }
    }

    pub fn side_failed(
        side: Side,
        node_id: impl Into<String>,
        fetched: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::SideFailed {
            side,
            node_id: node_id.into(),
            fetched,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_failed_names_side_and_count() {
        let err = ReconError::side_failed(Side::Right, "urn:node:MN1", 4200, "timed out");
        let msg = err.to_string();
        assert!(msg.contains("right"));
        assert!(msg.contains("urn:node:MN1"));
        assert!(msg.contains("4200"));
    }

    #[test]
    fn duplicate_names_identifier() {
        let err = ReconError::duplicate("urn:node:MN1", "pid-7");
        assert!(err.to_string().contains("pid-7"));
    }
}
