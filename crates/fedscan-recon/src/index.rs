//! In-memory inventory index.
//!
//! Materializes one node's full inventory keyed by identifier. Hundreds of
//! thousands of entries fit comfortably; this is an explicit scalability
//! ceiling of the design, not an accident.

use crate::error::{ReconError, ReconResult};
use fedscan_client::ObjectRecord;
use futures_util::{Stream, StreamExt};
use std::collections::HashMap;

/// Mapping from identifier to [`ObjectRecord`], built once per fetch pass and
/// never mutated afterwards. Rebuilt on every run: node contents change
/// between runs, and staleness must never be silently assumed.
#[derive(Debug)]
pub struct InventoryIndex {
    node_id: String,
    records: HashMap<String, ObjectRecord>,
}

impl InventoryIndex {
    /// Consume a record stream fully and index it.
    ///
    /// A duplicate identifier within a single node's inventory is a protocol
    /// violation and aborts the build; last-write-wins is not permitted.
    pub async fn build<S>(node_id: impl Into<String>, stream: S) -> ReconResult<Self>
    where
        S: Stream<Item = ReconResult<ObjectRecord>>,
    {
        let node_id = node_id.into();
        let mut records = HashMap::new();
        futures_util::pin_mut!(stream);

        while let Some(record) = stream.next().await {
            let record = record?;
            let identifier = record.identifier.clone();
            if records.insert(identifier.clone(), record).is_some() {
                return Err(ReconError::duplicate(&node_id, identifier));
            }
        }

        Ok(Self { node_id, records })
    }

    /// Index an already-collected inventory (tests, fixtures).
    pub fn from_records<I>(node_id: impl Into<String>, records: I) -> ReconResult<Self>
    where
        I: IntoIterator<Item = ObjectRecord>,
    {
        let node_id = node_id.into();
        let mut map = HashMap::new();
        for record in records {
            let identifier = record.identifier.clone();
            if map.insert(identifier.clone(), record).is_some() {
                return Err(ReconError::duplicate(&node_id, identifier));
            }
        }
        Ok(Self {
            node_id,
            records: map,
        })
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&ObjectRecord> {
        self.records.get(identifier)
    }

    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.records.contains_key(identifier)
    }

    /// Iterate over all identifiers (unordered).
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fedscan_client::{Checksum, ChecksumAlgorithm};
    use futures_util::stream;

    fn record(pid: &str) -> ObjectRecord {
        ObjectRecord {
            identifier: pid.to_string(),
            modified_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            checksum: Checksum::new(ChecksumAlgorithm::Sha256, "aa"),
            size: None,
        }
    }

    #[tokio::test]
    async fn build_indexes_all_records() {
        let stream = stream::iter(vec![Ok(record("a")), Ok(record("b")), Ok(record("c"))]);
        let index = InventoryIndex::build("urn:node:MN1", stream).await.unwrap();
        assert_eq!(index.len(), 3);
        assert!(index.contains("b"));
        assert!(index.get("d").is_none());
    }

    #[tokio::test]
    async fn duplicate_identifier_is_an_integrity_error() {
        let stream = stream::iter(vec![Ok(record("a")), Ok(record("b")), Ok(record("a"))]);
        let err = InventoryIndex::build("urn:node:MN1", stream)
            .await
            .unwrap_err();
        match err {
            ReconError::DuplicateIdentifier {
                node_id,
                identifier,
            } => {
                assert_eq!(node_id, "urn:node:MN1");
                assert_eq!(identifier, "a");
            }
            other => panic!("expected DuplicateIdentifier, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_error_propagates() {
        let stream = stream::iter(vec![Ok(record("a")), Err(ReconError::Cancelled)]);
        let err = InventoryIndex::build("urn:node:MN1", stream)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconError::Cancelled));
    }

    #[test]
    fn from_records_rejects_duplicates_too() {
        let result = InventoryIndex::from_records("n", vec![record("x"), record("x")]);
        assert!(matches!(
            result,
            Err(ReconError::DuplicateIdentifier { .. })
        ));
    }
}
