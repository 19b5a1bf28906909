//! Audit error types.
//!
//! Only failures of the authoritative step abort an audit. Per-replica
//! failures are captured in the replica's record and never raised; the audit
//! always reports one line per replica node.

use fedscan_client::ClientError;
use thiserror::Error;

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Fatal audit errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The authoritative index does not know the identifier.
    #[error("Unknown identifier: \"{0}\"")]
    UnknownIdentifier(String),

    /// The authoritative metadata record could not be retrieved.
    #[error("Authoritative metadata for \"{pid}\" unavailable: {source}")]
    MetadataUnavailable {
        pid: String,
        #[source]
        source: ClientError,
    },

    /// The coordinator's node registry could not be retrieved, so replica
    /// node addresses cannot be resolved.
    #[error("Node registry unavailable: {0}")]
    RegistryUnavailable(#[source] ClientError),

    /// The object declares no completed replicas to audit.
    #[error("Object \"{0}\" declares no completed replicas")]
    NoReplicas(String),

    /// The audit was cancelled by the caller.
    #[error("Audit cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_identifier() {
        let err = AuditError::UnknownIdentifier("X01".into());
        assert!(err.to_string().contains("X01"));

        let err = AuditError::NoReplicas("X01".into());
        assert!(err.to_string().contains("X01"));
    }
}
