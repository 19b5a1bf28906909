//! CLI error types and exit codes

use fedscan_audit::AuditError;
use fedscan_client::ClientError;
use fedscan_recon::ReconError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success, no discrepancies
/// - 1: General error
/// - 2: Configuration or usage error
/// - 3: Network error
/// - 4: Discrepancies or inconsistencies found
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No node matches \"{0}\"")]
    NodeNotFound(String),

    #[error("\"{pattern}\" matches more than one node: {matches}")]
    AmbiguousNode { pattern: String, matches: String },

    #[error("Node \"{0}\" is not a member node")]
    NotAMemberNode(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Recon(#[from] ReconError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Some run completed but reported discrepancies; the summary has already
    /// been printed, this only selects the exit code.
    #[error("{0}")]
    Discrepancies(String),

    /// A multi-node sweep finished but some nodes failed outright.
    #[error("{0}")]
    SweepFailed(String),

    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_)
            | CliError::NodeNotFound(_)
            | CliError::AmbiguousNode { .. }
            | CliError::NotAMemberNode(_) => 2,
            CliError::Client(e) if e.is_retryable() || e.is_server_error() => 3,
            CliError::Discrepancies(_) => 4,
            _ => 1,
        }
    }

    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();
        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_exit_2() {
        assert_eq!(CliError::NodeNotFound("gulf".into()).exit_code(), 2);
        assert_eq!(CliError::Config("missing URL".into()).exit_code(), 2);
    }

    #[test]
    fn network_errors_exit_3() {
        let err = CliError::Client(ClientError::Timeout {
            url: "https://cn.example.org/v2/object".into(),
            timeout_secs: 60,
        });
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn discrepancies_exit_4() {
        assert_eq!(
            CliError::Discrepancies("inventory differences found".into()).exit_code(),
            4
        );
    }
}
