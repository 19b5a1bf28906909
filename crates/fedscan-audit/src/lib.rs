//! Replica consistency auditor.
//!
//! Given one object identifier, retrieves its declared replica list from the
//! coordinating node and, for each replica node, compares the node's own
//! declared checksum against a checksum recomputed from the actual retrieved
//! bytes. Metadata can be correct while content is corrupted, or vice versa;
//! this is the defect class the auditor exists to catch.

pub mod auditor;
pub mod digest;
pub mod error;

pub use auditor::{AuditConfig, AuditOutcome, AuditVerdict, ReplicaAuditor, ReplicaRecord};
pub use digest::digest_stream;
pub use error::{AuditError, AuditResult};
