//! Typed HTTP clients for federated storage nodes.
//!
//! A federation has one coordinating node (authoritative index, replica
//! metadata, node registry, secondary search index) and many member nodes
//! (object storage). Both speak the same read-only collection API, so a
//! single [`NodeClient`] covers either role; registry and search-index
//! endpoints simply return 404 on nodes that do not serve them.

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::{ClientConfig, NodeClient};
pub use error::{ClientError, ClientResult};
pub use retry::RetryPolicy;
pub use types::{
    Checksum, ChecksumAlgorithm, NodeKind, NodeRecord, ObjectPage, ObjectRecord,
    ReplicaDescriptor, ReplicaStatus, SystemMetadata,
};
