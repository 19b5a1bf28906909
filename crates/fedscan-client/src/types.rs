//! Wire types shared by the coordinating- and member-node APIs.
//!
//! All types are validated at the deserialization boundary: a record missing
//! its identifier, timestamp, or checksum fails the whole response rather
//! than surfacing as a silent `None` downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digest algorithms a node may declare for its objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA-1", alias = "SHA1")]
    Sha1,
    #[serde(rename = "SHA-256", alias = "SHA256")]
    Sha256,
    #[serde(rename = "SHA-512", alias = "SHA512")]
    Sha512,
}

impl ChecksumAlgorithm {
    /// Canonical name as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA-1" | "SHA1" => Ok(Self::Sha1),
            "SHA-256" | "SHA256" => Ok(Self::Sha256),
            "SHA-512" | "SHA512" => Ok(Self::Sha512),
            other => Err(format!("unsupported checksum algorithm: {other}")),
        }
    }
}

/// A declared digest: algorithm plus lowercase hex value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    /// Hex digest, normalized to lowercase on deserialization.
    #[serde(deserialize_with = "lowercase_hex")]
    pub digest: String,
}

impl Checksum {
    #[must_use]
    pub fn new(algorithm: ChecksumAlgorithm, digest: impl Into<String>) -> Self {
        Self {
            algorithm,
            digest: digest.into().to_ascii_lowercase(),
        }
    }

    /// Whether two checksums agree. Requires the same algorithm; digests
    /// compare case-insensitively (normalization makes this a plain equality).
    #[must_use]
    pub fn matches(&self, other: &Checksum) -> bool {
        self.algorithm == other.algorithm && self.digest == other.digest
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

fn lowercase_hex<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.to_ascii_lowercase())
}

/// One inventory entry as reported by a node at fetch time. Immutable once
/// fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    /// Opaque, globally unique object identifier.
    pub identifier: String,
    /// When the node last modified the object's system metadata.
    pub modified_at: DateTime<Utc>,
    pub checksum: Checksum,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// One page of a node's object listing.
///
/// `total` is the record count as of this page and may change between pages
/// while remote writes land; callers must re-read it on every page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectPage {
    pub total: u64,
    pub start: u64,
    #[serde(default)]
    pub records: Vec<ObjectRecord>,
}

/// Replication state of one copy as tracked by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaStatus {
    Queued,
    Requested,
    Completed,
    Failed,
    Invalidated,
}

/// One node claiming to hold a replica of an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaDescriptor {
    pub node_id: String,
    pub status: ReplicaStatus,
}

/// The canonical metadata record for one object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetadata {
    pub identifier: String,
    pub checksum: Checksum,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub replicas: Vec<ReplicaDescriptor>,
}

/// Node role within the federation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Coordinator,
    Member,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinator => f.write_str("CN"),
            Self::Member => f.write_str("MN"),
        }
    }
}

/// One entry of the coordinator's node registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub node_id: String,
    pub base_url: String,
    pub kind: NodeKind,
}

/// Response of the secondary search-index count endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexCount {
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checksum_digest_normalized_to_lowercase() {
        let cs: Checksum =
            serde_json::from_value(json!({"algorithm": "SHA-256", "digest": "DEADBEEF"})).unwrap();
        assert_eq!(cs.digest, "deadbeef");
    }

    #[test]
    fn checksum_match_requires_same_algorithm() {
        let a = Checksum::new(ChecksumAlgorithm::Sha256, "deadbeef");
        let b = Checksum::new(ChecksumAlgorithm::Sha256, "DEADBEEF");
        let c = Checksum::new(ChecksumAlgorithm::Md5, "deadbeef");
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn algorithm_parses_common_spellings() {
        assert_eq!(
            "sha256".parse::<ChecksumAlgorithm>().unwrap(),
            ChecksumAlgorithm::Sha256
        );
        assert_eq!(
            "SHA-1".parse::<ChecksumAlgorithm>().unwrap(),
            ChecksumAlgorithm::Sha1
        );
        assert!("crc32".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn object_record_requires_identifier_and_checksum() {
        // Missing checksum must fail the record, not default it.
        let result: Result<ObjectRecord, _> = serde_json::from_value(json!({
            "identifier": "pid-1",
            "modifiedAt": "2024-05-01T12:00:00Z",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn object_page_roundtrip() {
        let page: ObjectPage = serde_json::from_value(json!({
            "total": 2,
            "start": 0,
            "records": [
                {
                    "identifier": "pid-1",
                    "modifiedAt": "2024-05-01T12:00:00Z",
                    "checksum": {"algorithm": "MD5", "digest": "abc123"},
                    "size": 42
                },
                {
                    "identifier": "pid-2",
                    "modifiedAt": "2024-05-02T12:00:00Z",
                    "checksum": {"algorithm": "MD5", "digest": "def456"}
                }
            ]
        }))
        .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].size, Some(42));
        assert_eq!(page.records[1].size, None);
    }
}
