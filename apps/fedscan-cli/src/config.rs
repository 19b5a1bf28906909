//! Connection settings shared by every subcommand.
//!
//! Everything is configurable from the environment so operator cron jobs can
//! run without flags: FEDSCAN_COORD_URL, FEDSCAN_CERT_PEM, FEDSCAN_CERT_KEY,
//! FEDSCAN_TIMEOUT_SECS, FEDSCAN_PAGE_SIZE.

use crate::error::{CliError, CliResult};
use clap::Args;
use fedscan_client::{ClientConfig, NodeClient};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Base URL of the coordinating node
    #[arg(long, env = "FEDSCAN_COORD_URL", value_name = "URL")]
    pub coord_url: String,

    /// PEM-encoded client certificate for authenticated access
    #[arg(long, env = "FEDSCAN_CERT_PEM", value_name = "PATH")]
    pub cert_pem: Option<PathBuf>,

    /// PEM-encoded private key for the client certificate (defaults to the
    /// certificate file when the key is bundled there)
    #[arg(long, env = "FEDSCAN_CERT_KEY", value_name = "PATH", requires = "cert_pem")]
    pub cert_key: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, env = "FEDSCAN_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification (test environments only)
    #[arg(long)]
    pub tls_insecure: bool,
}

impl ConnectionArgs {
    /// Build the shared client settings: timeout, TLS, optional identity.
    pub fn client_config(&self) -> CliResult<ClientConfig> {
        let mut config = ClientConfig::new()
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_tls_verify(!self.tls_insecure);

        if let Some(cert_path) = &self.cert_pem {
            // reqwest wants certificate and key in one PEM blob.
            let mut pem = std::fs::read(cert_path).map_err(|e| {
                CliError::Config(format!("cannot read {}: {e}", cert_path.display()))
            })?;
            if let Some(key_path) = &self.cert_key {
                let key = std::fs::read(key_path).map_err(|e| {
                    CliError::Config(format!("cannot read {}: {e}", key_path.display()))
                })?;
                pem.extend_from_slice(b"\n");
                pem.extend_from_slice(&key);
            }
            config = config.with_identity_pem(pem);
        }

        Ok(config)
    }

    /// Client for the coordinating node.
    pub fn coordinator(&self) -> CliResult<NodeClient> {
        Ok(NodeClient::new(&self.coord_url, &self.client_config()?)?)
    }
}
